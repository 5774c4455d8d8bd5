//! MCP tools and the registry that dispatches to them.
//!
//! Tools are grouped by capability. A [`ToolRegistry`] is built for a set of
//! [`CapabilityGroup`]s and owns the shared [`ToolContext`].

mod crypto;
mod email;
mod files;
mod system;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::WorkspaceConfig;
use crate::crypto::CryptoClient;
use crate::email::EmailService;
use crate::error::{Error, Result};
use crate::files::FileManager;
use crate::protocol::{ResourceContents, ResourceTemplate, ToolCallResult, ToolDefinition};
use crate::system::SystemMonitor;

/// Tool trait for implementing MCP tools.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult>;
}

/// Services shared by all tools.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub files: FileManager,
    pub system: SystemMonitor,
    pub crypto: CryptoClient,
    pub email: EmailService,
}

impl ToolContext {
    /// Create a tool context from explicit services.
    pub fn new(
        files: FileManager,
        system: SystemMonitor,
        crypto: CryptoClient,
        email: EmailService,
    ) -> Self {
        Self {
            files,
            system,
            crypto,
            email,
        }
    }

    /// Build every service from config.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self> {
        Ok(Self::new(
            FileManager::new(&config.files),
            SystemMonitor::new(),
            CryptoClient::new(&config.crypto)?,
            EmailService::from_config(&config.email),
        ))
    }
}

/// A set of related tools with one resource template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityGroup {
    Files,
    System,
    Crypto,
    Email,
}

impl CapabilityGroup {
    pub const ALL: [CapabilityGroup; 4] = [
        CapabilityGroup::Files,
        CapabilityGroup::System,
        CapabilityGroup::Crypto,
        CapabilityGroup::Email,
    ];

    /// Name the group reports when it runs alone.
    pub fn server_name(&self) -> &'static str {
        match self {
            CapabilityGroup::Files => "file-manager",
            CapabilityGroup::System => "system-monitor",
            CapabilityGroup::Crypto => "crypto-tracker",
            CapabilityGroup::Email => "email-server",
        }
    }

    /// URI scheme of the group's resources.
    pub fn scheme(&self) -> &'static str {
        match self {
            CapabilityGroup::Files => "file",
            CapabilityGroup::System => "system",
            CapabilityGroup::Crypto => "crypto",
            CapabilityGroup::Email => "email",
        }
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        match self {
            CapabilityGroup::Files => files::tools(),
            CapabilityGroup::System => system::tools(),
            CapabilityGroup::Crypto => crypto::tools(),
            CapabilityGroup::Email => email::tools(),
        }
    }

    pub fn resource_template(&self) -> ResourceTemplate {
        let (placeholder, name, description) = match self {
            CapabilityGroup::Files => ("path", "File", "Access file system resources"),
            CapabilityGroup::System => ("resource", "System", "Access system resources"),
            CapabilityGroup::Crypto => ("symbol", "Crypto", "Access cryptocurrency resources"),
            CapabilityGroup::Email => ("resource", "Email", "Access email resources"),
        };
        ResourceTemplate {
            uri_template: format!("{}://{{{}}}", self.scheme(), placeholder),
            name: name.into(),
            description: description.into(),
            mime_type: "text/plain".into(),
        }
    }

    fn describe(&self, target: &str, context: &ToolContext) -> String {
        match self {
            CapabilityGroup::Files => context.files.describe_resource(target),
            CapabilityGroup::System => format!("System resource: {}", target),
            CapabilityGroup::Crypto => crate::crypto::describe_resource(target),
            CapabilityGroup::Email => crate::email::describe_resource(target),
        }
    }
}

impl fmt::Display for CapabilityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Which groups one server process exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ServerSelection {
    /// Every capability group in one process.
    #[default]
    All,
    Files,
    System,
    Crypto,
    Email,
}

impl ServerSelection {
    pub fn groups(&self) -> Vec<CapabilityGroup> {
        match self {
            ServerSelection::All => CapabilityGroup::ALL.to_vec(),
            ServerSelection::Files => vec![CapabilityGroup::Files],
            ServerSelection::System => vec![CapabilityGroup::System],
            ServerSelection::Crypto => vec![CapabilityGroup::Crypto],
            ServerSelection::Email => vec![CapabilityGroup::Email],
        }
    }

    /// Name reported in `serverInfo`.
    pub fn server_name(&self) -> &'static str {
        match self {
            ServerSelection::All => "workspace-agent",
            ServerSelection::Files => CapabilityGroup::Files.server_name(),
            ServerSelection::System => CapabilityGroup::System.server_name(),
            ServerSelection::Crypto => CapabilityGroup::Crypto.server_name(),
            ServerSelection::Email => CapabilityGroup::Email.server_name(),
        }
    }
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    groups: Vec<CapabilityGroup>,
    context: Arc<ToolContext>,
}

impl ToolRegistry {
    /// Create a registry holding the tools of `groups`.
    pub fn for_groups(groups: &[CapabilityGroup], context: ToolContext) -> Self {
        let mut groups = groups.to_vec();
        groups.sort();
        groups.dedup();

        let mut registry = Self {
            tools: HashMap::new(),
            groups,
            context: Arc::new(context),
        };
        for group in registry.groups.clone() {
            for tool in group.tools() {
                registry.register(tool);
            }
        }
        debug!("Registered {} tools", registry.tools.len());
        registry
    }

    /// Register a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Tool {} registered twice", name);
        }
    }

    /// Enabled groups, in order.
    pub fn groups(&self) -> &[CapabilityGroup] {
        &self.groups
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::InvalidParams(format!("unknown tool: {}", name)))?;

        tool.execute(arguments, &self.context).await
    }

    /// Resource templates of the enabled groups.
    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.groups.iter().map(|g| g.resource_template()).collect()
    }

    /// Resolve a resource URI against the enabled groups.
    pub fn read_resource(&self, uri: &str) -> Result<ResourceContents> {
        let (scheme, target) = uri
            .split_once("://")
            .ok_or_else(|| Error::InvalidParams(format!("malformed resource URI: {}", uri)))?;
        let group = self
            .groups
            .iter()
            .find(|g| g.scheme() == scheme)
            .ok_or_else(|| Error::InvalidParams(format!("unsupported resource URI: {}", uri)))?;

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: "text/plain".into(),
            text: group.describe(target, &self.context),
        })
    }
}

/// Decode tool arguments; a missing object counts as empty.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidParams(e.to_string()))
}

/// Run filesystem or probe work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Turn a domain failure into an `isError` result prefixed with `action`.
/// Argument errors propagate.
fn reported(result: Result<ToolCallResult>, action: &str) -> Result<ToolCallResult> {
    match result {
        Err(e) if !e.is_caller_error() => {
            warn!("{} failed: {}", action, e);
            Ok(ToolCallResult::error(format!("❌ {}: {}", action, e)))
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::{CryptoConfig, FilesConfig};
    use crate::email::testing::{MemorySender, MemoryStore};

    /// Context with default services and an in-memory mailbox.
    pub fn context_with_mail(store: MemoryStore) -> (ToolContext, Arc<MemoryStore>, Arc<MemorySender>) {
        let store = Arc::new(store);
        let sender = Arc::new(MemorySender::default());
        let context = ToolContext::new(
            FileManager::new(&FilesConfig::default()),
            SystemMonitor::default(),
            CryptoClient::new(&CryptoConfig::default()).unwrap(),
            EmailService::new(store.clone(), sender.clone(), "me@example.org"),
        );
        (context, store, sender)
    }

    pub fn context() -> ToolContext {
        context_with_mail(MemoryStore::default()).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_registry_is_sorted_and_complete() {
        let registry = ToolRegistry::for_groups(&CapabilityGroup::ALL, testing::context());
        let names = registry.names();
        assert_eq!(names.len(), 29);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let defs = registry.definitions();
        assert_eq!(defs.len(), 29);
        assert!(defs.iter().all(|d| d.input_schema["type"] == json!("object")));
    }

    #[test]
    fn test_group_tool_counts() {
        let counts: Vec<usize> = CapabilityGroup::ALL
            .iter()
            .map(|g| ToolRegistry::for_groups(&[*g], testing::context()).names().len())
            .collect();
        assert_eq!(counts, vec![11, 5, 5, 8]);
    }

    #[test]
    fn test_server_selection() {
        assert_eq!(ServerSelection::All.groups().len(), 4);
        assert_eq!(ServerSelection::Crypto.groups(), vec![CapabilityGroup::Crypto]);
        assert_eq!(ServerSelection::Email.server_name(), "email-server");
        assert_eq!(ServerSelection::default(), ServerSelection::All);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_caller_error() {
        let registry = ToolRegistry::for_groups(&[CapabilityGroup::Files], testing::context());
        let err = registry.execute("get_crypto_price", json!({})).await.unwrap_err();
        assert!(err.is_caller_error());
    }

    #[tokio::test]
    async fn test_missing_argument_is_caller_error() {
        let registry = ToolRegistry::for_groups(&[CapabilityGroup::Files], testing::context());
        let err = registry.execute("read_file", json!({})).await.unwrap_err();
        assert!(err.is_caller_error());
        assert!(err.to_string().contains("file_path"));
    }

    #[test]
    fn test_resource_templates_and_reads() {
        let registry = ToolRegistry::for_groups(
            &[CapabilityGroup::Crypto, CapabilityGroup::System],
            testing::context(),
        );
        let templates: Vec<String> = registry
            .resource_templates()
            .into_iter()
            .map(|t| t.uri_template)
            .collect();
        assert_eq!(templates, vec!["system://{resource}", "crypto://{symbol}"]);

        let contents = registry.read_resource("crypto://btc").unwrap();
        assert_eq!(contents.text, "Crypto resource: BTC");
        assert_eq!(
            registry.read_resource("system://cpu").unwrap().text,
            "System resource: cpu"
        );

        assert!(registry.read_resource("email://inbox").unwrap_err().is_caller_error());
        assert!(registry.read_resource("no-scheme").is_err());
    }

    #[test]
    fn test_parse_args_accepts_null() {
        #[derive(serde::Deserialize)]
        struct Empty {}
        assert!(parse_args::<Empty>(Value::Null).is_ok());
    }

    #[test]
    fn test_reported_keeps_caller_errors() {
        let folded = reported(Err(Error::Upstream("down".into())), "Error reading emails").unwrap();
        assert!(folded.is_error);
        assert_eq!(folded.joined_text(), "❌ Error reading emails: upstream error: down");

        let passed = reported(Err(Error::InvalidParams("bad".into())), "x");
        assert!(passed.is_err());
    }
}
