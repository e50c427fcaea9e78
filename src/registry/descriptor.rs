//! Resource descriptors
//!
//! A descriptor binds one resource's paths, key columns, writable columns
//! and SQL statements together. Statements are generated once from the
//! column list so placeholder `$i` always lines up with `columns[i - 1]`.
//!
//! Every statement yields rows as `to_jsonb(row)`, leaving type
//! conversion (numeric, date, json) to PostgreSQL.

use crate::dispatch::binder::placeholder_indices;
use crate::error::{GatewayError, Result};
use serde::Serialize;

/// How a writable column is validated and cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Numeric,
    Date,
}

impl ColumnKind {
    /// SQL cast applied to the text-bound parameter
    pub fn cast(&self) -> &'static str {
        match self {
            ColumnKind::Text => "::text",
            ColumnKind::Integer => "::text::bigint",
            ColumnKind::Numeric => "::text::numeric",
            ColumnKind::Date => "::text::date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

impl Column {
    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Static record binding a resource to its queries
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub name: &'static str,
    pub collection_path: String,
    pub item_path_template: String,
    /// Column compared against the identifier on item reads
    pub read_key: &'static str,
    /// Column compared against the identifier on update/delete
    pub write_key: Option<&'static str>,
    pub columns: Vec<Column>,
    pub select_all_query: String,
    pub select_one_query: String,
    pub insert_query: Option<String>,
    pub update_query: Option<String>,
    pub delete_query: Option<String>,
}

impl ResourceDescriptor {
    pub fn builder(table: &'static str, read_key: &'static str) -> DescriptorBuilder {
        DescriptorBuilder {
            table,
            read_key,
            order_by: vec![read_key],
            item_order_by: None,
            write_key: None,
            columns: Vec::new(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.insert_query.is_none() && self.update_query.is_none() && self.delete_query.is_none()
    }

    /// Check each statement's placeholder count against its binding shape
    pub fn validate(&self) -> Result<()> {
        let expect = |query: &str, expected: usize, label: &str| -> Result<()> {
            let found = placeholder_indices(query);
            // Placeholders must be exactly $1..=$expected, no gaps
            if found.iter().copied().ne(1..=expected) {
                return Err(GatewayError::InvalidRegistry(format!(
                    "{} {} query binds {:?}, expected $1..=${}",
                    self.name, label, found, expected
                )));
            }
            Ok(())
        };

        expect(&self.select_all_query, 0, "select-all")?;
        expect(&self.select_one_query, 1, "select-one")?;

        if let Some(query) = &self.insert_query {
            expect(query, self.columns.len(), "insert")?;
        }
        if let Some(query) = &self.update_query {
            expect(query, self.columns.len() + 1, "update")?;
        }
        if let Some(query) = &self.delete_query {
            expect(query, 1, "delete")?;
        }

        if !self.is_read_only() && self.columns.is_empty() {
            return Err(GatewayError::InvalidRegistry(format!(
                "{} is writable but declares no columns",
                self.name
            )));
        }

        Ok(())
    }
}

pub struct DescriptorBuilder {
    table: &'static str,
    read_key: &'static str,
    order_by: Vec<&'static str>,
    item_order_by: Option<Vec<&'static str>>,
    write_key: Option<&'static str>,
    columns: Vec<Column>,
}

impl DescriptorBuilder {
    pub fn order_by(mut self, columns: &[&'static str]) -> Self {
        self.order_by = columns.to_vec();
        self
    }

    /// Ordering for item reads, when it differs from the collection ordering
    pub fn item_order_by(mut self, columns: &[&'static str]) -> Self {
        self.item_order_by = Some(columns.to_vec());
        self
    }

    /// Make the resource writable: insert, update and delete keyed on `write_key`
    pub fn writable(mut self, write_key: &'static str, columns: &[Column]) -> Self {
        self.write_key = Some(write_key);
        self.columns = columns.to_vec();
        self
    }

    pub fn build(self) -> ResourceDescriptor {
        let table = self.table;
        let order = order_clause(&self.order_by);
        let item_order = order_clause(self.item_order_by.as_deref().unwrap_or(&self.order_by));

        let select_all_query = format!("SELECT to_jsonb(r) FROM public.{table} r{order}");
        let select_one_query = format!(
            "SELECT to_jsonb(r) FROM public.{table} r WHERE r.{}::text = $1{item_order}",
            self.read_key
        );

        let (insert_query, update_query, delete_query) = match self.write_key {
            Some(write_key) => {
                let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
                let values: Vec<String> = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("${}{}", i + 1, c.kind.cast()))
                    .collect();
                let assignments: Vec<String> = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{} = ${}{}", c.name, i + 1, c.kind.cast()))
                    .collect();

                let insert = format!(
                    "WITH r AS (INSERT INTO public.{table} ({}) VALUES ({}) RETURNING *) SELECT to_jsonb(r) FROM r",
                    names.join(", "),
                    values.join(", ")
                );
                let update = format!(
                    "UPDATE public.{table} SET {} WHERE {write_key}::text = ${}",
                    assignments.join(", "),
                    self.columns.len() + 1
                );
                let delete = format!("DELETE FROM public.{table} WHERE {write_key}::text = $1");

                (Some(insert), Some(update), Some(delete))
            }
            None => (None, None, None),
        };

        ResourceDescriptor {
            name: table,
            collection_path: format!("/{table}"),
            item_path_template: format!("/{table}/:{}", self.read_key),
            read_key: self.read_key,
            write_key: self.write_key,
            columns: self.columns,
            select_all_query,
            select_one_query,
            insert_query,
            update_query,
            delete_query,
        }
    }
}

fn order_clause(columns: &[&str]) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let qualified: Vec<String> = columns.iter().map(|c| format!("r.{c}")).collect();
    format!(" ORDER BY {}", qualified.join(", "))
}
