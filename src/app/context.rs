//! Shared service context.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditLog, AuditSink, SqliteAuditSink};
use crate::config::Config;
use crate::evidence::EvidenceContext;
use crate::initialization::{init_client, init_redirect_client};
use crate::intelligence::{LlmClient, OpenAiClient};
use crate::pipeline::EnforcementPipeline;
use crate::queue::{HttpMailer, Mailer, QueueKicker, QueueProcessor};
use crate::side_effects::SideEffects;
use crate::timestamp::{Notary, OpenTimestampsNotary, TimestampService};
use crate::whois::WhoisClient;

/// Everything a request handler or job needs, cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub pipeline: EnforcementPipeline,
    pub processor: Arc<QueueProcessor>,
    pub timestamps: TimestampService,
    pub whois: Option<Arc<WhoisClient>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub side_effects: SideEffects,
    /// Set once the queue scheduler runs
    pub kicker: Option<QueueKicker>,
}

impl AppContext {
    /// Wires collaborators from `config`. Optional services without
    /// configuration are left out and their features degrade.
    ///
    /// Returns the side effect dispatcher task when a CRM webhook is set.
    pub fn build(
        config: Config,
        pool: SqlitePool,
        cancel: &CancellationToken,
    ) -> Result<(Self, Option<JoinHandle<()>>)> {
        let client = init_client(&config).context("Failed to build HTTP client")?;
        let redirect_client =
            init_redirect_client(&config).context("Failed to build redirect client")?;

        let notary: Option<Arc<dyn Notary>> = (!config.disable_timestamps).then(|| {
            Arc::new(OpenTimestampsNotary::new(
                client.clone(),
                &config.notary_calendar_url,
                &config.esplora_url,
            )) as Arc<dyn Notary>
        });
        let timestamps = TimestampService::new(notary);

        let whois = WhoisClient::from_config(&config, client.clone()).map(Arc::new);
        if whois.is_none() {
            log::info!("WHOIS API not configured; registrar contacts come from detection data only");
        }
        let llm = OpenAiClient::from_config(&config, client.clone())
            .map(|c| Arc::new(c) as Arc<dyn LlmClient>);
        if llm.is_none() {
            log::warn!("LLM API key not set; AI filter passes every result through for review");
        }
        let mailer = HttpMailer::from_config(&config, client.clone())
            .map(|m| Arc::new(m) as Arc<dyn Mailer>);

        let (side_effects, dispatcher) = match &config.crm_webhook_url {
            Some(url) => {
                let (effects, handle) = SideEffects::spawn(client.clone(), url.clone(), cancel.clone());
                (effects, Some(handle))
            }
            None => (SideEffects::disabled(), None),
        };

        let audit_sink: Arc<dyn AuditSink> = Arc::new(SqliteAuditSink::new(pool.clone()));
        let evidence = EvidenceContext::from_config(&config, client.clone(), redirect_client);
        let pipeline = EnforcementPipeline::new(
            pool.clone(),
            evidence,
            whois.clone(),
            timestamps.clone(),
            side_effects.clone(),
        );
        let processor = Arc::new(QueueProcessor::new(
            pool.clone(),
            mailer,
            audit_sink.clone(),
            side_effects.clone(),
            &config,
        ));

        let ctx = Self {
            pool,
            config: Arc::new(config),
            client,
            pipeline,
            processor,
            timestamps,
            whois,
            llm,
            audit_sink,
            side_effects,
            kicker: None,
        };
        Ok((ctx, dispatcher))
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// A fresh audit buffer for one request or job run.
    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.audit_sink.clone(), self.config.audit_buffer_size)
    }
}
