//! Built-in table catalog for the CRM API.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::client::EndpointDescriptor;
use crate::row::RAW_JSON_FIELD;

/// Number of free-form `r1..rN` answer columns on `lista_lead`.
const LEAD_ANSWER_COLUMNS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bigint,
    Boolean,
    Timestamp,
    Varchar,
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bigint => "BIGINT",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::Varchar => "VARCHAR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A queryable table backed by one API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub table_name: String,
    pub endpoint_name: String,
    /// Column whose predicates are pushed down as the request window.
    pub date_column_name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn endpoint(&self) -> EndpointDescriptor {
        EndpointDescriptor::new(self.endpoint_name.clone(), self.date_column_name.clone())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    tables: Vec<TableDefinition>,
}

impl Catalog {
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }

    /// The nine CRM tables exposed by the API, each with a trailing `raw_json`
    /// column.
    pub fn builtin() -> Self {
        use ColumnType::{Bigint, Boolean, Timestamp, Varchar};

        let mut lead_columns = vec![
            ("id_lead", Bigint),
            ("dt_criacao", Timestamp),
            ("dt_modificacao", Timestamp),
            ("tp_entrada", Bigint),
            ("id_usuario", Bigint),
            ("id_cliente", Bigint),
            ("id_funil", Bigint),
            ("ds_chave", Varchar),
            ("id_marca", Bigint),
            ("id_unidade", Bigint),
            ("fl_consultado", Boolean),
            ("fl_higienizado", Boolean),
            ("dt_higienizado", Timestamp),
            ("ds_lead_migrado", Varchar),
        ]
        .into_iter()
        .map(|(name, column_type)| ColumnDefinition::new(name, column_type))
        .collect::<Vec<_>>();
        lead_columns.extend(
            (1..=LEAD_ANSWER_COLUMNS)
                .map(|index| ColumnDefinition::new(format!("r{index}"), Varchar)),
        );

        let tables = vec![
            table("lista_lead", "lista-lead", "dt_criacao", lead_columns),
            table(
                "lista_protocolo",
                "lista-protocolo",
                "dt_criacao",
                columns(&[
                    ("id_protocoloatendimento", Bigint),
                    ("dt_criacao", Timestamp),
                    ("dt_modificacao", Timestamp),
                    ("tp_entrada", Bigint),
                    ("id_lead", Bigint),
                    ("ds_protocolo", Varchar),
                    ("id_departamento", Bigint),
                    ("id_motivoprotocolo", Bigint),
                ]),
            ),
            table(
                "lista_protocolo_status",
                "lista-protocolo-status",
                "dt_criacao",
                columns(&[
                    ("id_protocoloatendimentostatus", Bigint),
                    ("id_protocoloatendimento", Bigint),
                    ("dt_criacao", Timestamp),
                    ("dt_modificacao", Timestamp),
                    ("id_usuario", Bigint),
                    ("fl_ativo", Boolean),
                    ("tp_status", Bigint),
                ]),
            ),
            table(
                "lista_atendimento",
                "lista-atendimento",
                "dt_criacao",
                columns(&[
                    ("id_atendimentolead", Bigint),
                    ("dt_criacao", Timestamp),
                    ("id_cliente", Bigint),
                    ("tp_atendimento", Bigint),
                    ("id_usuario", Bigint),
                    ("id_funil", Bigint),
                    ("id_lead", Bigint),
                    ("id_atendimentochat", Bigint),
                    ("id_atendimentochatbot", Bigint),
                    ("ds_observacao", Varchar),
                ]),
            ),
            table(
                "lista_contato_chat",
                "lista-contato-chat",
                "dt_cadastro",
                columns(&[
                    ("id_contato", Bigint),
                    ("dt_cadastro", Timestamp),
                    ("id_cliente", Bigint),
                    ("id_lead", Bigint),
                    ("nm_nome", Varchar),
                    ("nu_telefone", Bigint),
                    ("ds_email", Varchar),
                    ("nu_cpf", Varchar),
                ]),
            ),
            table(
                "lista_atendimento_chat",
                "lista-atendimento-chat",
                "dt_entrada",
                columns(&[
                    ("id_fila", Bigint),
                    ("dt_entrada", Timestamp),
                    ("id_campanha", Bigint),
                    ("id_contato", Bigint),
                    ("fl_status", Bigint),
                    ("id_usuario", Bigint),
                    ("dt_inicioatend", Timestamp),
                    ("dt_finalatend", Timestamp),
                    ("id_funil", Bigint),
                    ("id_fase", Bigint),
                ]),
            ),
            table(
                "lista_mensagem_atendimento_chat",
                "lista-mensagem-atendimento-chat",
                "dt_mensagem",
                columns(&[
                    ("id_mensagens_atendimento", Bigint),
                    ("dt_mensagem", Timestamp),
                    ("id_fila", Bigint),
                    ("ds_mensagem", Varchar),
                    ("fl_lida", Boolean),
                    ("fl_direcao", Bigint),
                ]),
            ),
            table(
                "lista_atendimento_chatbot",
                "lista-atendimento-chatbot",
                "dt_criacao",
                columns(&[
                    ("id_contato", Bigint),
                    ("dt_criacao", Timestamp),
                    ("id_cliente", Bigint),
                    ("fl_finalizado", Boolean),
                    ("dt_finalizacao", Timestamp),
                    ("id_funil", Bigint),
                    ("id_lead", Bigint),
                    ("id_departamento", Bigint),
                    ("nm_nome", Varchar),
                    ("nu_telefone", Varchar),
                    ("ds_dados", Varchar),
                    ("ds_acesso", Varchar),
                ]),
            ),
            table(
                "lista_mensagem_atendimento_chatbot",
                "lista-mensagem-atendimento-chatbot",
                "dt_criacao",
                columns(&[
                    ("id_contatomensagem", Bigint),
                    ("dt_criacao", Timestamp),
                    ("id_contato", Bigint),
                    ("nu_ordem", Bigint),
                    ("tp_mensagem", Bigint),
                    ("tp_direcao", Bigint),
                    ("nu_etapa", Bigint),
                    ("ds_horario", Varchar),
                    ("ds_mensagem", Varchar),
                ]),
            ),
        ];

        Self::new(tables)
    }

    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    /// Case-insensitive lookup by table name.
    pub fn get(&self, table_name: &str) -> Option<&TableDefinition> {
        self.tables
            .iter()
            .find(|table| table.table_name.eq_ignore_ascii_case(table_name))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn columns(spec: &[(&str, ColumnType)]) -> Vec<ColumnDefinition> {
    spec.iter()
        .map(|(name, column_type)| ColumnDefinition::new(*name, *column_type))
        .collect()
}

fn table(
    table_name: &str,
    endpoint_name: &str,
    date_column_name: &str,
    mut columns: Vec<ColumnDefinition>,
) -> TableDefinition {
    columns.push(ColumnDefinition::new(RAW_JSON_FIELD, ColumnType::Varchar));
    TableDefinition {
        table_name: table_name.to_owned(),
        endpoint_name: endpoint_name.to_owned(),
        date_column_name: date_column_name.to_owned(),
        columns,
    }
}
