use crate::core::cur::CurDetector;
use crate::core::known::KnownResources;
use crate::core::sql;
use crate::domain::model::{DependsOn, ViewResource};
use crate::domain::ports::AthenaApi;
use crate::utils::error::Result;
use indexmap::IndexMap;
use std::collections::HashSet;

/// A table or view as found in Athena, before any rewriting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedView {
    pub name: String,
    pub is_view: bool,
    /// `SHOW CREATE VIEW` / `SHOW CREATE TABLE` output.
    pub data: String,
    /// Existing tables and views referenced by the view, in order of appearance.
    pub dependencies: Vec<String>,
}

pub struct ViewResolver<'a, A: AthenaApi> {
    athena: &'a A,
    database: String,
}

impl<'a, A: AthenaApi> ViewResolver<'a, A> {
    pub fn new(athena: &'a A, database: impl Into<String>) -> Self {
        Self {
            athena,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .athena
            .get_table_metadata(&self.database, name)
            .await?
            .is_some())
    }

    /// Resolves `names` and, depth first, every view or table they read from.
    /// Each name is resolved once; missing top-level tables are skipped.
    pub async fn process_views(&self, names: &[String]) -> Result<IndexMap<String, ResolvedView>> {
        let mut resolved: IndexMap<String, ResolvedView> = IndexMap::new();
        let mut missing: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = names.iter().rev().cloned().collect();

        while let Some(name) = stack.pop() {
            if resolved.contains_key(&name) || missing.contains(&name) {
                continue;
            }

            let Some(table) = self
                .athena
                .get_table_metadata(&self.database, &name)
                .await?
            else {
                tracing::warn!("Table {} not found in database {}. Skipping.", name, self.database);
                missing.insert(name);
                continue;
            };

            if !table.is_view() {
                tracing::debug!("{} is a table ({:?})", name, table.table_type);
                let ddl = self
                    .athena
                    .query(&self.database, &format!("SHOW CREATE TABLE `{}`", name))
                    .await?
                    .join("\n");
                resolved.insert(
                    name.clone(),
                    ResolvedView {
                        name,
                        is_view: false,
                        data: ddl,
                        dependencies: vec![],
                    },
                );
                continue;
            }

            let sql = self
                .athena
                .query(&self.database, &format!("SHOW CREATE VIEW `{}`", name))
                .await?
                .join("\n");

            let mut dependencies = Vec::new();
            for candidate in sql::referenced_tables(&sql) {
                if candidate.eq_ignore_ascii_case(&name) {
                    continue;
                }
                if resolved.contains_key(&candidate) || self.table_exists(&candidate).await? {
                    dependencies.push(candidate);
                } else {
                    tracing::debug!("{} referenced by {} is not a table", candidate, name);
                }
            }
            tracing::debug!("{} depends on {:?}", name, dependencies);

            stack.extend(dependencies.iter().rev().cloned());
            resolved.insert(
                name.clone(),
                ResolvedView {
                    name,
                    is_view: true,
                    data: sql,
                    dependencies,
                },
            );
        }

        Ok(resolved)
    }

    /// Rewrites resolved views into resources: database and CUR placeholders,
    /// `CREATE OR REPLACE VIEW`, CUR dependencies folded into `cur: true`.
    /// CUR tables are dropped, as are common views unless `export_known` is set.
    pub async fn export_views(
        &self,
        resolved: &IndexMap<String, ResolvedView>,
        known: &KnownResources,
        export_known: bool,
    ) -> Result<IndexMap<String, ViewResource>> {
        let cur = CurDetector::new(self.athena, self.database.clone());
        let mut cur_tables: HashSet<String> = HashSet::new();
        let mut processed: IndexMap<String, ViewResource> = IndexMap::new();

        for (name, view) in resolved {
            let mut data = sql::parameterize_database(&view.data, &self.database);
            data = sql::create_or_replace(&data);

            let mut depends_on = DependsOn::default();
            for dep in &view.dependencies {
                if cur.is_cur(dep).await? {
                    tracing::debug!("{} is cur", dep);
                    depends_on.cur = true;
                    data = sql::replace_table_name(&data, dep, sql::CUR_TABLE_PLACEHOLDER);
                    cur_tables.insert(dep.clone());
                } else {
                    tracing::debug!("{} is not cur", dep);
                    depends_on.views.push(dep.clone());
                }
            }

            processed.insert(
                name.clone(),
                ViewResource {
                    data: sql::strip_trailing_whitespace(&data),
                    depends_on,
                },
            );
        }
        tracing::debug!("cur_tables = {:?}", cur_tables);

        let mut views = IndexMap::new();
        for (name, view) in processed {
            if cur_tables.contains(&name) || cur.is_cur(&name).await? {
                tracing::debug!("Skipping {} view - it is a CUR", name);
                continue;
            }
            if known.has_view(&name) && !export_known {
                tracing::info!("View {} is a common view. Skipping.", name);
                continue;
            }
            for bucket in sql::s3_buckets(&view.data) {
                tracing::warn!(
                    "Please replace manually location bucket with a parameter: s3://{}",
                    bucket
                );
            }
            views.insert(name, view);
        }
        Ok(views)
    }
}
