//! Column projection and JSON embedding.
//!
//! [`CompiledQuery`] is the sealed per-scope result of the orchestrator: one
//! table instance, its projection, filters and pagination, plus the child
//! scopes embedded as columns. Lowering to a [`Query`] happens once, at the
//! end, so every scope can be inspected in isolation.

use crate::sql::{
    and_all, json_array_agg_or_empty, json_object, lit_int, table_col, Expr, ExprExt,
    OrderByExpr, Query, SelectExpr,
};

use super::alias::TableAlias;

/// How a scope's rows are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embedding {
    /// Plain column list, one SQL row per entity.
    Row,
    /// One JSON object (or NULL) per parent row.
    Object,
    /// JSON array of objects, empty when nothing matches.
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionValue {
    /// A column of the scope's table.
    Column(Expr),
    /// A nested scope, embedded as a correlated sub-select.
    Relation(Box<CompiledQuery>),
    /// A computed expression (aggregates).
    Expr(Expr),
}

/// One output column of a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub output: String,
    pub value: ProjectionValue,
}

impl ProjectionItem {
    pub fn column(output: impl Into<String>, alias: &str, column: &str) -> Self {
        Self {
            output: output.into(),
            value: ProjectionValue::Column(table_col(alias, column)),
        }
    }

    pub fn relation(output: impl Into<String>, child: CompiledQuery) -> Self {
        Self {
            output: output.into(),
            value: ProjectionValue::Relation(Box::new(child)),
        }
    }

    pub fn expr(output: impl Into<String>, expr: Expr) -> Self {
        Self {
            output: output.into(),
            value: ProjectionValue::Expr(expr),
        }
    }

    fn to_select(&self) -> SelectExpr {
        let expr = match &self.value {
            ProjectionValue::Column(expr) | ProjectionValue::Expr(expr) => expr.clone(),
            ProjectionValue::Relation(child) => child.to_expr(),
        };
        expr.alias(&self.output)
    }
}

/// A table joined inside a scope (the join table of a many-to-many relation).
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeJoin {
    pub table: TableAlias,
    pub on: Expr,
}

/// Sealed result of compiling one selection scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub table: TableAlias,
    pub joins: Vec<ScopeJoin>,
    pub embedding: Embedding,
    pub projection: Vec<ProjectionItem>,
    /// Equality of key pairs tying the scope to its parent row.
    pub correlation: Option<Expr>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    /// Alias of the derived table wrapping the row query (Object/Array only).
    pub wrapper_alias: Option<String>,
}

impl CompiledQuery {
    pub fn new(table: TableAlias, embedding: Embedding) -> Self {
        Self {
            table,
            joins: Vec::new(),
            embedding,
            projection: Vec::new(),
            correlation: None,
            filter: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            wrapper_alias: None,
        }
    }

    /// Output names in projection order.
    pub fn output_names(&self) -> Vec<&str> {
        self.projection.iter().map(|p| p.output.as_str()).collect()
    }

    /// Nested scopes embedded in this one, in projection order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &CompiledQuery)> {
        self.projection.iter().filter_map(|p| match &p.value {
            ProjectionValue::Relation(child) => Some((p.output.as_str(), child.as_ref())),
            _ => None,
        })
    }

    /// The flat row query: projected columns over the scope's table.
    pub fn row_query(&self) -> Query {
        let mut query = Query::new()
            .select(self.projection.iter().map(ProjectionItem::to_select).collect::<Vec<_>>())
            .from(self.table.table_ref());

        for join in &self.joins {
            query = query.inner_join(join.table.table_ref(), join.on.clone());
        }

        let predicates = self.correlation.iter().chain(self.filter.iter()).cloned();
        if let Some(predicate) = and_all(predicates) {
            query = query.filter(predicate);
        }

        query = query
            .group_by(self.group_by.clone())
            .order_by(self.order_by.clone());
        if let Some(limit) = &self.limit {
            query = query.limit(limit.clone());
        }
        if let Some(offset) = &self.offset {
            query = query.offset(offset.clone());
        }
        query
    }

    /// Lower to a complete statement according to the embedding mode.
    pub fn to_query(&self) -> Query {
        let row = self.row_query();
        let wrapper = match (&self.embedding, &self.wrapper_alias) {
            (Embedding::Row, _) | (_, None) => return row,
            (_, Some(alias)) => alias.as_str(),
        };

        let object = json_object(
            self.projection
                .iter()
                .map(|p| (p.output.clone(), table_col(wrapper, &p.output)))
                .collect(),
        );
        let value = match self.embedding {
            Embedding::Array => json_array_agg_or_empty(object),
            _ => object,
        };
        Query::new()
            .select(vec![value])
            .from_subquery(row, wrapper)
    }

    /// The scope as a scalar sub-select for a parent's column list.
    pub fn to_expr(&self) -> Expr {
        Expr::Subquery(Box::new(self.to_query()))
    }
}

/// `SELECT 1 FROM <scope>` for EXISTS checks.
pub fn exists_probe(table: &TableAlias, joins: &[ScopeJoin], predicate: Option<Expr>) -> Query {
    let mut query = Query::new()
        .select(vec![lit_int(1)])
        .from(table.table_ref());
    for join in joins {
        query = query.inner_join(join.table.table_ref(), join.on.clone());
    }
    match predicate {
        Some(predicate) => query.filter(predicate),
        None => query,
    }
}
