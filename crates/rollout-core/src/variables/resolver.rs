use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::environment::{Database, DatabaseGrant, Environment, Server};
use crate::error::PlanResult;
use crate::store::{PropertyLookup, TopologyStore};

use super::{VariableContext, VariableRecord, VariableValue};

/// Prefix stripped from the Endur database name to form `EnvironmentShortName`.
pub const ENDUR_DB_PREFIX: &str = "Endur_";

const ENDUR: &str = "Endur";
const ENDUR_REPORTING: &str = "Endur Reporting";
const ENDUR_EXTERNAL: &str = "Endur External";

/// Computes the variable scope for an environment.
///
/// Topology is read fresh on every call. Categories with no rows leave
/// their keys unset.
pub struct VariableScopeResolver {
    topology: Arc<dyn TopologyStore>,
    properties: Arc<dyn PropertyLookup>,
}

impl VariableScopeResolver {
    pub fn new(topology: Arc<dyn TopologyStore>, properties: Arc<dyn PropertyLookup>) -> Self {
        Self {
            topology,
            properties,
        }
    }

    #[instrument(skip_all, fields(environment = %environment.name))]
    pub fn resolve<C>(&self, environment: &Environment, context: &mut C) -> PlanResult<()>
    where
        C: VariableContext + ?Sized,
    {
        let servers = self.topology.servers(environment.id)?;
        let databases = self.topology.databases(environment.id)?;
        let grants = self.topology.database_grants(environment.id)?;

        context.set(
            "EnvironmentName".to_string(),
            VariableValue::scalar(&environment.name),
        );
        install_servers(&servers, context);
        install_databases(&databases, context);
        install_permissions(&databases, &grants, context);
        install_shortcuts(environment, &databases, context);

        if let Some(path) = self.properties.file_share_path(environment)? {
            context.set("FileSharePath".to_string(), VariableValue::Scalar(path));
        }
        if let Some(path) = self.properties.config_file_path(environment)? {
            context.set("ConfigFilePath".to_string(), VariableValue::Scalar(path));
        }

        debug!(
            servers = servers.len(),
            databases = databases.len(),
            "resolved variable scope"
        );
        Ok(())
    }
}

/// Key suffix for a tag or type; `None` when blank.
fn key_part(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.replace(' ', "_"))
}

fn install_servers<C: VariableContext + ?Sized>(servers: &[Server], context: &mut C) {
    if servers.is_empty() {
        return;
    }

    let mut by_tag: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for server in servers {
        for tag in server.application_tags.iter().filter_map(|t| key_part(t)) {
            let names = by_tag.entry(tag).or_default();
            if !names.contains(&server.name) {
                names.push(server.name.clone());
            }
        }
    }

    for (tag, names) in by_tag {
        if let Some(first) = names.first() {
            context.set(format!("Server_{tag}"), VariableValue::scalar(first));
        }
        context.set(format!("ServerNames_{tag}"), VariableValue::from_matches(names));
    }

    context.set(
        "ServerNames".to_string(),
        VariableValue::Array(servers.iter().map(|s| s.name.clone()).collect()),
    );
    context.set(
        "Servers".to_string(),
        VariableValue::Table(servers.iter().map(server_record).collect()),
    );
}

fn server_record(server: &Server) -> VariableRecord {
    let daemons = server
        .daemons
        .iter()
        .map(|d| {
            VariableRecord::new()
                .with("Name", VariableValue::scalar(&d.name))
                .with("DisplayName", VariableValue::scalar(&d.display_name))
                .with("Account", VariableValue::scalar(&d.account))
                .with("Type", VariableValue::scalar(&d.daemon_type))
        })
        .collect();

    VariableRecord::new()
        .with("Name", VariableValue::scalar(&server.name))
        .with("OsName", VariableValue::scalar(&server.os_name))
        .with(
            "ApplicationTags",
            VariableValue::Scalar(server.application_tags.join(", ")),
        )
        .with("Daemons", VariableValue::Table(daemons))
}

fn install_databases<C: VariableContext + ?Sized>(databases: &[Database], context: &mut C) {
    // type -> (servers, names), kept parallel
    let mut by_type: BTreeMap<String, (Vec<String>, Vec<String>)> = BTreeMap::new();
    for database in databases {
        let Some(db_type) = key_part(&database.db_type) else {
            continue;
        };
        let (servers, names) = by_type.entry(db_type).or_default();
        servers.push(database.server.clone());
        names.push(database.name.clone());
    }

    for (db_type, (servers, names)) in by_type {
        context.set(format!("DbServer_{db_type}"), VariableValue::from_matches(servers));
        context.set(format!("DbName_{db_type}"), VariableValue::from_matches(names));
    }
}

fn install_permissions<C: VariableContext + ?Sized>(
    databases: &[Database],
    grants: &[DatabaseGrant],
    context: &mut C,
) {
    if databases.is_empty() {
        return;
    }

    let rows = databases
        .iter()
        .map(|database| {
            let mut users: Vec<(&str, Vec<String>)> = Vec::new();
            for grant in grants.iter().filter(|g| g.database == database.name) {
                let index = match users.iter().position(|(user, _)| *user == grant.user) {
                    Some(index) => index,
                    None => {
                        users.push((grant.user.as_str(), Vec::new()));
                        users.len() - 1
                    }
                };
                let roles = &mut users[index].1;
                for role in &grant.roles {
                    if !roles.contains(role) {
                        roles.push(role.clone());
                    }
                }
            }

            let users = users
                .into_iter()
                .map(|(user, roles)| {
                    VariableRecord::new()
                        .with("User", VariableValue::scalar(user))
                        .with("Roles", VariableValue::Array(roles))
                })
                .collect();

            VariableRecord::new()
                .with("DatabaseName", VariableValue::scalar(&database.name))
                .with("DatabaseType", VariableValue::scalar(&database.db_type))
                .with("Users", VariableValue::Table(users))
        })
        .collect();

    context.set("DatabasePermissions".to_string(), VariableValue::Table(rows));
}

fn find_by_type<'a>(databases: &'a [Database], db_type: &str) -> Option<&'a Database> {
    databases
        .iter()
        .find(|d| d.db_type.trim().eq_ignore_ascii_case(db_type))
}

fn install_shortcuts<C: VariableContext + ?Sized>(
    environment: &Environment,
    databases: &[Database],
    context: &mut C,
) {
    let short_name = match find_by_type(databases, ENDUR) {
        Some(endur) => {
            context.set("EndurDbName".to_string(), VariableValue::scalar(&endur.name));
            context.set("EndurDbServer".to_string(), VariableValue::scalar(&endur.server));
            endur
                .name
                .strip_prefix(ENDUR_DB_PREFIX)
                .unwrap_or(&endur.name)
                .to_string()
        }
        None => environment.name.replace(' ', "_"),
    };
    context.set(
        "EnvironmentShortName".to_string(),
        VariableValue::Scalar(short_name),
    );

    for (db_type, prefix) in [
        (ENDUR_REPORTING, "EndurReporting"),
        (ENDUR_EXTERNAL, "EndurExternal"),
    ] {
        if let Some(database) = find_by_type(databases, db_type) {
            context.set(format!("{prefix}DbName"), VariableValue::scalar(&database.name));
            context.set(format!("{prefix}DbServer"), VariableValue::scalar(&database.server));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCatalog;
    use std::collections::HashMap;

    fn server(name: &str, tags: &[&str]) -> Server {
        Server {
            name: name.to_string(),
            os_name: "Windows Server 2019".to_string(),
            application_tags: tags.iter().map(|t| t.to_string()).collect(),
            daemons: Vec::new(),
        }
    }

    fn resolve(
        catalog: Arc<MemoryCatalog>,
        environment: &Environment,
    ) -> HashMap<String, VariableValue> {
        let resolver = VariableScopeResolver::new(catalog.clone(), catalog);
        let mut context: HashMap<String, VariableValue> = HashMap::new();
        resolver.resolve(environment, &mut context).unwrap();
        context
    }

    #[test]
    fn test_tag_with_spaces_uses_underscores() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_server(1, server("app01", &["App Server"])).unwrap();

        let context = resolve(catalog, &Environment::new(1, "UAT"));

        assert_eq!(
            context.get("ServerNames_App_Server"),
            Some(&VariableValue::scalar("app01"))
        );
        assert_eq!(context.get("Server_App_Server"), Some(&VariableValue::scalar("app01")));
    }

    #[test]
    fn test_grants_are_grouped_by_user() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_database(1, Database::new("PAY", "sql01", "Payments")).unwrap();
        let grants = [
            ("svc", "reader"),
            ("ops", "owner"),
            ("svc", "writer"),
            ("svc", "reader"),
        ];
        for (user, role) in grants {
            catalog
                .add_grant(
                    1,
                    DatabaseGrant {
                        database: "PAY".to_string(),
                        user: user.to_string(),
                        roles: vec![role.to_string()],
                    },
                )
                .unwrap();
        }

        let context = resolve(catalog, &Environment::new(1, "UAT"));

        let rows = context["DatabasePermissions"].as_table().unwrap();
        assert_eq!(rows.len(), 1);
        let users = rows[0].get("Users").and_then(VariableValue::as_table).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].get("User"), Some(&VariableValue::scalar("svc")));
        assert_eq!(
            users[0].get("Roles"),
            Some(&VariableValue::Array(vec!["reader".to_string(), "writer".to_string()]))
        );
    }

    #[test]
    fn test_blank_tags_and_types_install_no_keys() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_server(1, server("web01", &["Web", " ", ""])).unwrap();
        catalog.add_database(1, Database::new("MISC", "sql01", "  ")).unwrap();

        let context = resolve(catalog, &Environment::new(1, "UAT"));

        for key in ["Server_", "ServerNames_", "DbServer_", "DbName_"] {
            assert!(!context.contains_key(key), "unexpected key {key}");
        }
        assert_eq!(context.get("Server_Web"), Some(&VariableValue::scalar("web01")));
        assert!(context.contains_key("DatabasePermissions"));
    }

    #[test]
    fn test_short_name_from_environment_without_endur() {
        let catalog = Arc::new(MemoryCatalog::new());
        let context = resolve(catalog, &Environment::new(1, "Pre Prod"));

        assert_eq!(
            context.get("EnvironmentShortName"),
            Some(&VariableValue::scalar("Pre_Prod"))
        );
        assert!(!context.contains_key("EndurDbName"));
    }

    #[test]
    fn test_short_name_strips_endur_prefix() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_database(1, Database::new("Endur_UAT2", "sql09", "Endur")).unwrap();

        let context = resolve(catalog, &Environment::new(1, "UAT 2"));

        assert_eq!(context.get("EnvironmentShortName"), Some(&VariableValue::scalar("UAT2")));
        assert_eq!(context.get("EndurDbServer"), Some(&VariableValue::scalar("sql09")));
        assert_eq!(context.get("DbName_Endur"), Some(&VariableValue::scalar("Endur_UAT2")));
    }
}
