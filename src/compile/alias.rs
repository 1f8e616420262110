//! Table alias allocation.
//!
//! Every table instance introduced during one compile gets a fresh alias, even
//! when the same table appears twice (self relations, EXISTS filters on the
//! same table). Allocators are created per compile call and never shared.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::schema::TableName;
use crate::sql::TableRef;

/// Source of unique table aliases for one compile call.
pub trait AliasAllocator {
    fn next_alias(&mut self) -> String;

    /// Allocate an alias for a table instance.
    fn allocate(&mut self, table: &TableName) -> TableAlias {
        let alias = self.next_alias();
        trace!(table = %table, alias = %alias, "allocated alias");
        TableAlias {
            table: table.clone(),
            alias,
        }
    }
}

/// Yields `sq0`, `sq1`, ... Deterministic; used where output must be compared.
#[derive(Debug, Default)]
pub struct SequentialAliases {
    next: usize,
}

impl SequentialAliases {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AliasAllocator for SequentialAliases {
    fn next_alias(&mut self) -> String {
        let alias = format!("sq{}", self.next);
        self.next += 1;
        alias
    }
}

const RANDOM_ALIAS_LEN: usize = 6;

/// Yields random six-letter lower-case aliases, never repeating within one allocator.
#[derive(Debug)]
pub struct RandomAliases {
    rng: StdRng,
    issued: HashSet<String>,
}

impl RandomAliases {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            issued: HashSet::new(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }
}

impl Default for RandomAliases {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasAllocator for RandomAliases {
    fn next_alias(&mut self) -> String {
        loop {
            let alias: String = (0..RANDOM_ALIAS_LEN)
                .map(|_| char::from(self.rng.random_range(b'a'..=b'z')))
                .collect();
            if self.issued.insert(alias.clone()) {
                return alias;
            }
        }
    }
}

/// Which allocator a compile call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasStrategy {
    #[default]
    Random,
    Sequential,
}

impl AliasStrategy {
    /// Fresh allocator for one compile call.
    pub fn allocator(self, seed: Option<u64>) -> Box<dyn AliasAllocator> {
        match (self, seed) {
            (AliasStrategy::Sequential, _) => Box::new(SequentialAliases::new()),
            (AliasStrategy::Random, Some(seed)) => Box::new(RandomAliases::seeded(seed)),
            (AliasStrategy::Random, None) => Box::new(RandomAliases::new()),
        }
    }
}

/// A table instance and the alias it is known by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAlias {
    pub table: TableName,
    pub alias: String,
}

impl TableAlias {
    /// `schema.table AS alias` for a FROM or JOIN clause.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.table.name)
            .with_optional_schema(self.table.schema.as_deref())
            .with_alias(&self.alias)
    }
}
