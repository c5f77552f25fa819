// src/services/prefix.rs

//! Department prefix bookkeeping and inference.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::models::{CourseListing, DepartmentRegistry, Prefix};
use crate::services::CatalogClient;

/// Prefixes known during a scrape run, keyed by department code.
#[derive(Debug, Default)]
pub struct PrefixTable {
    prefixes: HashMap<String, Prefix>,
}

impl PrefixTable {
    /// Seed from the previously published registry, then apply operator
    /// overrides. Overrides holding a sentinel are ignored.
    pub fn seeded(prior: &DepartmentRegistry, manual: &BTreeMap<String, String>) -> Self {
        let mut prefixes: HashMap<String, Prefix> = prior
            .iter()
            .map(|(code, record)| (code.clone(), record.prefix.clone()))
            .collect();

        for (code, raw) in manual {
            let prefix = Prefix::from(raw.as_str());
            if prefix.is_usable() {
                prefixes.insert(code.clone(), prefix);
            }
        }

        Self { prefixes }
    }

    pub fn get(&self, dept_code: &str) -> Option<&Prefix> {
        self.prefixes.get(dept_code)
    }

    /// Prefix for output, [`Prefix::Missing`] if nothing is known.
    pub fn prefix_of(&self, dept_code: &str) -> Prefix {
        self.get(dept_code).cloned().unwrap_or_default()
    }

    /// Record that a department lists no course, keeping any earlier value.
    pub fn mark_no_course(&mut self, dept_code: &str) {
        self.prefixes
            .entry(dept_code.to_string())
            .or_insert(Prefix::NoCourse);
    }

    /// Prior resolved prefixes are authoritative; everything else is probed.
    pub fn needs_probe(&self, dept_code: &str) -> bool {
        !self.get(dept_code).is_some_and(Prefix::is_usable)
    }

    pub fn set(&mut self, dept_code: &str, prefix: Prefix) {
        self.prefixes.insert(dept_code.to_string(), prefix);
    }
}

/// Infers a department's prefix from the catalog page of one of its courses.
pub struct PrefixResolver<'c, 'a> {
    client: &'c CatalogClient<'a>,
}

impl<'c, 'a> PrefixResolver<'c, 'a> {
    pub fn new(client: &'c CatalogClient<'a>) -> Self {
        Self { client }
    }

    /// Probe with the first listed course. No token yields [`Prefix::Unresolved`].
    pub async fn resolve(&self, dept_code: &str, courses: &[CourseListing]) -> Result<Prefix> {
        let Some(first) = courses.first() else {
            return Ok(Prefix::Unresolved);
        };

        let prefix = match self.client.probe_prefix(dept_code, &first.code).await? {
            Some(token) => Prefix::Resolved(token),
            None => Prefix::Unresolved,
        };
        log::debug!("Resolved prefix for {}: {:?}", dept_code, prefix);
        Ok(prefix)
    }
}
