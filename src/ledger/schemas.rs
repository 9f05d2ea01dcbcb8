use crate::api::ApiBuilder;
use crate::error::BuildError;
use crate::schema::{Field, FieldType, Schema, SchemaRef};

/// References to the ledger's registered schemas
#[derive(Debug, Clone)]
pub struct LedgerSchemas {
    pub account: SchemaRef,
    pub create_account: SchemaRef,
    pub transaction: SchemaRef,
    pub create_transaction: SchemaRef,
}

impl LedgerSchemas {
    /// Register `Account`, `CreateAccount`, `Transaction` and `CreateTransaction`.
    ///
    /// # Errors
    ///
    /// Any of the names is already registered.
    pub fn register(builder: &mut ApiBuilder) -> Result<Self, BuildError> {
        let account = builder.schema(
            "Account",
            Schema::new()
                .describe("A ledger account")
                .field(Field::required("id", FieldType::Integer))
                .field(Field::required("name", FieldType::String))
                .field(Field::required("available_cash", FieldType::Number)),
        )?;
        let create_account = builder.schema(
            "CreateAccount",
            Schema::new()
                .describe("Account to open; the id is assigned by the ledger")
                .field(Field::required("name", FieldType::String))
                .field(Field::required("available_cash", FieldType::Number)),
        )?;
        let transaction = builder.schema(
            "Transaction",
            Schema::new()
                .describe("A transfer attempt, successful or not")
                .field(Field::required("id", FieldType::Integer))
                .field(Field::required("cash_amount", FieldType::Number))
                .field(Field::required("source_account_id", FieldType::Integer))
                .field(Field::required("destination_account_id", FieldType::Integer))
                .field(
                    Field::optional("registered_time", FieldType::Integer)
                        .nullable()
                        .describe("Unix seconds"),
                )
                .field(
                    Field::optional("executed_time", FieldType::Integer)
                        .nullable()
                        .describe("Unix seconds"),
                )
                .field(Field::optional("success", FieldType::Boolean).nullable()),
        )?;
        let create_transaction = builder.schema(
            "CreateTransaction",
            Schema::new()
                .field(Field::required("cash_amount", FieldType::Number))
                .field(Field::required("source_account_id", FieldType::Integer))
                .field(Field::required("destination_account_id", FieldType::Integer)),
        )?;

        Ok(Self {
            account,
            create_account,
            transaction,
            create_transaction,
        })
    }
}
