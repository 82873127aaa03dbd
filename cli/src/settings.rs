//! Options shared by `render-events` and `serve`, and the rendering
//! environment built from them.

use anyhow::{Context, Result};
use chainpretty_batch::{
    BatchEngine, DiscordWebhook, DryRunPublisher, MessageSink, OutputSpec, PubSubPublisher,
    Publisher, RawLogsOutput,
};
use chainpretty_core::{AddressBook, Chain, Event, InMemoryAddressBook};
use chainpretty_evm::EventDecoder;
use chainpretty_filter::{find_template, load_rules_file, read_template_rules, FilterFactory, TemplateRule};
use chainpretty_observability::PrettyMetrics;
use chainpretty_registry::EventRegistry;
use chainpretty_render::{
    init_environment, resolve_chain_id, ChainDirectory, EnvGlobals, Rainbow, Renderer,
    TemplateRenderer,
};
use clap::Args;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

use crate::rpc::RpcClient;

#[derive(Debug, Clone, Args)]
pub struct RenderSettings {
    /// Search paths for ABI JSON files
    #[arg(long, num_args = 1.., required = true, env = "CHAINPRETTY_ABI_PATHS", value_delimiter = ',')]
    pub abi_paths: Vec<PathBuf>,

    /// Search paths for templates
    #[arg(long, num_args = 1.., required = true, env = "CHAINPRETTY_TEMPLATE_PATHS", value_delimiter = ',')]
    pub template_paths: Vec<PathBuf>,

    /// YAML or JSON file with template rules
    #[arg(long, env = "CHAINPRETTY_RULES")]
    pub rules: Option<PathBuf>,

    /// Render every event with this template (used when no --rules)
    #[arg(long, env = "CHAINPRETTY_TEMPLATE")]
    pub template: Option<String>,

    /// Template tried when the selected one fails to render
    #[arg(long, env = "CHAINPRETTY_ON_ERROR_TEMPLATE")]
    pub on_error_template: Option<String>,

    /// The RPC endpoint
    #[arg(long, env = "CHAINPRETTY_RPC_URL")]
    pub rpc_url: Option<String>,

    /// The id of the chain
    #[arg(long, env = "CHAINPRETTY_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// File like https://chainid.network/chains.json
    #[arg(long, env = "CHAINPRETTY_CHAINS_FILE")]
    pub chains_file: Option<PathBuf>,

    /// JSON file mapping addresses to names (or names to addresses)
    #[arg(long, env = "CHAINPRETTY_ADDRESS_BOOK")]
    pub address_book: Option<PathBuf>,

    /// JSON file mapping hashes to names (or names to hashes, or a list of names)
    #[arg(long, env = "CHAINPRETTY_BYTES32_RAINBOW")]
    pub bytes32_rainbow: Option<PathBuf>,

    /// Deliver to this Discord webhook instead of printing
    #[arg(long, env = "CHAINPRETTY_DISCORD_URL")]
    pub discord_url: Option<String>,

    /// Output URLs: print://[?file=..], discord://<host>/<path>,
    /// pubsubrawlogs://?project_id=..&topic=..[&dry_run=true]
    #[arg(long = "output-url", env = "CHAINPRETTY_OUTPUT_URLS", value_delimiter = ',')]
    pub output_urls: Vec<OutputSpec>,

    /// OAuth2 access token for Pub/Sub outputs
    #[arg(long, env = "CHAINPRETTY_PUBSUB_TOKEN", hide_env_values = true)]
    pub pubsub_token: Option<String>,

    /// Pub/Sub API base URL (an emulator, for instance)
    #[arg(long, env = "CHAINPRETTY_PUBSUB_ENDPOINT")]
    pub pubsub_endpoint: Option<String>,

    /// Transactions delivered concurrently
    #[arg(long, default_value_t = 4, env = "CHAINPRETTY_CONCURRENCY")]
    pub concurrency: usize,
}

/// A configured destination.
#[derive(Clone)]
pub enum Output {
    /// Rendered text to a file or stdout
    Print { file: Option<PathBuf> },
    /// Rendered text packed into webhook messages
    Discord(Arc<dyn MessageSink>),
    /// Raw logs of each transaction
    RawLogs(RawLogsOutput),
}

impl Output {
    pub fn kind(&self) -> &'static str {
        match self {
            Output::Print { .. } => "print",
            Output::Discord(_) => "discord",
            Output::RawLogs(_) => "pubsubrawlogs",
        }
    }

    fn from_spec(spec: &OutputSpec, settings: &RenderSettings) -> Self {
        match spec {
            OutputSpec::Print { file } => Output::Print { file: file.clone() },
            OutputSpec::Discord { url } => {
                Output::Discord(Arc::new(DiscordWebhook::new(url.as_str())))
            }
            OutputSpec::PubSubRawLogs {
                project_id,
                topic,
                dry_run,
            } => {
                let publisher: Arc<dyn Publisher> = if *dry_run {
                    info!(%project_id, %topic, "raw logs output in dry-run mode");
                    Arc::new(DryRunPublisher::stdout())
                } else {
                    let publisher = PubSubPublisher::new(settings.pubsub_token.clone());
                    match &settings.pubsub_endpoint {
                        Some(endpoint) => Arc::new(publisher.with_endpoint(endpoint.as_str())),
                        None => Arc::new(publisher),
                    }
                };
                Output::RawLogs(RawLogsOutput::new(publisher, project_id, topic))
            }
        }
    }
}

/// Everything needed to decode, select, render and deliver.
pub struct RenderEnv {
    pub decoder: EventDecoder,
    pub renderer: Arc<TemplateRenderer>,
    pub rules: Arc<Vec<TemplateRule>>,
    pub on_error_template: Option<String>,
    pub chain: Arc<Chain>,
    pub rpc: Option<RpcClient>,
    /// Empty means the command's default (stdout for `render-events`)
    pub outputs: Vec<Output>,
    pub concurrency: usize,
    pub metrics: PrettyMetrics,
}

impl RenderEnv {
    pub async fn setup(settings: &RenderSettings) -> Result<Self> {
        let registry = EventRegistry::new();
        let count = registry
            .load_paths(settings.abi_paths.as_slice())
            .context("loading ABIs")?;
        info!(events = count, topics = registry.len(), "event definitions loaded");

        let rpc = settings.rpc_url.as_deref().map(RpcClient::new).transpose()?;
        let node_chain_id = match &rpc {
            Some(rpc) => Some(rpc.chain_id().await.context("querying the node chain id")?),
            None => None,
        };
        let chain_id = resolve_chain_id(settings.chain_id, node_chain_id)?;

        let address_book: Arc<dyn AddressBook> = match &settings.address_book {
            Some(path) => Arc::new(InMemoryAddressBook::from_file(path)?),
            None => Arc::new(InMemoryAddressBook::new()),
        };
        let mut globals = EnvGlobals::new(chain_id).with_address_book(Arc::clone(&address_book));
        if let Some(path) = &settings.chains_file {
            globals = globals.with_chains(ChainDirectory::from_file(path)?);
        }
        if let Some(path) = &settings.bytes32_rainbow {
            globals = globals.with_rainbow(Rainbow::from_file(path)?);
        }
        let chain = globals.chain();

        let renderer = init_environment(settings.template_paths.as_slice(), globals)?;
        let factory = FilterFactory::new(address_book);
        let rules = match (&settings.rules, &settings.template) {
            (Some(path), _) => load_rules_file(&factory, path)
                .with_context(|| format!("loading rules from {}", path.display()))?,
            (None, Some(template)) => read_template_rules(
                &factory,
                &serde_json::json!({"rules": [{"match": {"filter_type": "true"}, "template": template}]}),
            )?,
            (None, None) => anyhow::bail!("Either --rules or --template must be specified"),
        };

        let mut outputs: Vec<Output> = settings
            .output_urls
            .iter()
            .map(|spec| Output::from_spec(spec, settings))
            .collect();
        if let Some(url) = &settings.discord_url {
            outputs.push(Output::Discord(Arc::new(DiscordWebhook::new(url.as_str()))));
        }
        for spec in &settings.output_urls {
            info!(output = %spec, "output configured");
        }

        Ok(Self {
            decoder: EventDecoder::new(registry),
            renderer: Arc::new(renderer),
            rules: Arc::new(rules),
            on_error_template: settings.on_error_template.clone(),
            chain,
            rpc,
            outputs,
            concurrency: settings.concurrency,
            metrics: PrettyMetrics::global(),
        })
    }

    pub fn rpc(&self) -> Result<&RpcClient> {
        self.rpc
            .as_ref()
            .context("--rpc-url is required for this input")
    }

    pub fn batch_engine(&self) -> BatchEngine {
        let renderer: Arc<dyn Renderer> = self.renderer.clone();
        let engine = BatchEngine::new(Arc::clone(&self.rules), renderer);
        match &self.on_error_template {
            Some(t) => engine.on_error_template(t.clone()),
            None => engine,
        }
    }

    /// Render one event with the template its rules select. `None` when no
    /// rule matches or every candidate template fails.
    pub fn render(&self, event: &Event) -> Option<String> {
        let template = find_template(&self.rules, event)?;
        let mut templates = vec![template];
        if let Some(fallback) = self.on_error_template.as_deref() {
            templates.push(fallback);
        }
        match self.renderer.render_first(&templates, event) {
            Ok(text) => Some(text),
            Err(_) => {
                self.metrics.record_render_failures(&self.chain.name, 1);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn fixtures() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures"))
}

/// Polygon, fixture ABIs, templates and rules; no RPC and no outputs.
#[cfg(test)]
pub(crate) fn fixture_settings() -> RenderSettings {
    RenderSettings {
        abi_paths: vec![fixtures().join("abis")],
        template_paths: vec![fixtures().join("templates")],
        rules: Some(fixtures().join("rules.yaml")),
        template: None,
        on_error_template: None,
        rpc_url: None,
        chain_id: Some(137),
        chains_file: Some(fixtures().join("chains.json")),
        address_book: None,
        bytes32_rainbow: None,
        discord_url: None,
        output_urls: Vec::new(),
        pubsub_token: None,
        pubsub_endpoint: None,
        concurrency: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outputs_follow_settings() {
        let mut settings = fixture_settings();
        settings.output_urls = vec![
            "print://?file=out.txt".parse().unwrap(),
            "pubsubrawlogs://?project_id=acme&topic=raw&dry_run=true".parse().unwrap(),
        ];
        settings.discord_url = Some("https://discord.com/api/webhooks/1/token".into());
        let env = RenderEnv::setup(&settings).await.unwrap();
        let kinds: Vec<_> = env.outputs.iter().map(Output::kind).collect();
        assert_eq!(kinds, vec!["print", "pubsubrawlogs", "discord"]);
        let Output::RawLogs(raw) = &env.outputs[1] else {
            panic!("expected a raw logs output");
        };
        assert_eq!(raw.topic_path(), "projects/acme/topics/raw");
        assert_eq!(env.chain.name, "Polygon Mainnet");
    }

    #[tokio::test]
    async fn rules_or_template_required() {
        let mut settings = fixture_settings();
        settings.rules = None;
        let err = RenderEnv::setup(&settings).await.err().unwrap();
        assert!(err.to_string().contains("--rules or --template"));

        settings.template = Some("generic-event.md.j2".into());
        let env = RenderEnv::setup(&settings).await.unwrap();
        assert_eq!(env.rules.len(), 1);
    }
}
