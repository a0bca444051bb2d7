//! Profiling sessions: pull a profile from a source, redact it, re-render
//! the callgraph and archive the result.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{
    CallgraphModel, CallscopeResult, Clock, DiagramRenderer, HistoryItem, Ledger, RenderOptions,
    RewriteRules, SAMPLE_PROFILE_JSON, SystemClock, UnbalancedPolicy, parse_profile,
    rewrite_profile_json,
};

/// Options handed to the source when it serializes its profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub processor_options: BTreeMap<String, serde_json::Value>,
}

/// Something that can record a profile and emit it as speedscope JSON.
pub trait ProfileSource {
    fn start(&mut self) -> CallscopeResult<()>;
    fn stop(&mut self) -> CallscopeResult<()>;
    fn is_running(&self) -> bool;
    fn output(&self, config: &RendererConfig) -> CallscopeResult<String>;
}

/// Replays a fixed document. Counts starts and stops.
#[derive(Debug, Clone)]
pub struct RecordedProfile {
    raw_json: String,
    running: bool,
    pub starts: usize,
    pub stops: usize,
}

impl RecordedProfile {
    pub fn new(raw_json: impl Into<String>) -> Self {
        Self {
            raw_json: raw_json.into(),
            running: false,
            starts: 0,
            stops: 0,
        }
    }
}

impl ProfileSource for RecordedProfile {
    fn start(&mut self) -> CallscopeResult<()> {
        self.running = true;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> CallscopeResult<()> {
        self.running = false;
        self.stops += 1;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn output(&self, _config: &RendererConfig) -> CallscopeResult<String> {
        Ok(self.raw_json.clone())
    }
}

/// Current profile, render options and the last good diagram.
///
/// Nothing re-renders implicitly; callers mutate inputs and then call
/// [`CallgraphView::recompute`].
#[derive(Debug, Clone)]
pub struct CallgraphView {
    profile_json: String,
    options: RenderOptions,
    policy: UnbalancedPolicy,
    diagram: Option<String>,
}

impl Default for CallgraphView {
    fn default() -> Self {
        Self::new(SAMPLE_PROFILE_JSON, RenderOptions::default(), UnbalancedPolicy::default())
    }
}

impl CallgraphView {
    pub fn new(profile_json: impl Into<String>, options: RenderOptions, policy: UnbalancedPolicy) -> Self {
        Self {
            profile_json: profile_json.into(),
            options,
            policy,
            diagram: None,
        }
    }

    pub fn profile_json(&self) -> &str {
        &self.profile_json
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn diagram(&self) -> Option<&str> {
        self.diagram.as_deref()
    }

    pub fn set_profile(&mut self, profile_json: impl Into<String>) {
        self.profile_json = profile_json.into();
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn set_policy(&mut self, policy: UnbalancedPolicy) {
        self.policy = policy;
    }

    pub fn model(&self) -> CallscopeResult<CallgraphModel> {
        let doc = parse_profile(&self.profile_json)?;
        CallgraphModel::from_document(&doc, self.policy)
    }

    /// Parse, compile and render. On error the previous diagram is kept.
    pub fn recompute(&mut self) -> CallscopeResult<&str> {
        let model = self.model()?;
        let diagram = DiagramRenderer::new(self.options.clone())?.render(&model)?;
        Ok(self.diagram.insert(diagram).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub profile_json: String,
    pub diagram: String,
    pub archived: Option<HistoryItem>,
}

pub struct ProfilingSession<S: ProfileSource, C: Clock = SystemClock> {
    pub name: String,
    pub renderer_config: RendererConfig,
    source: S,
    rules: RewriteRules,
    view: CallgraphView,
    ledger: Ledger<C>,
}

impl<S: ProfileSource, C: Clock> ProfilingSession<S, C> {
    pub fn new(
        name: impl Into<String>,
        source: S,
        rules: RewriteRules,
        view: CallgraphView,
        ledger: Ledger<C>,
    ) -> Self {
        Self {
            name: name.into(),
            renderer_config: RendererConfig::default(),
            source,
            rules,
            view,
            ledger,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn view(&self) -> &CallgraphView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut CallgraphView {
        &mut self.view
    }

    pub fn ledger(&self) -> &Ledger<C> {
        &self.ledger
    }

    pub fn is_profiling(&self) -> bool {
        self.source.is_running()
    }

    /// Begin a fresh recording, stopping one already in progress.
    pub fn start(&mut self) -> CallscopeResult<()> {
        if self.source.is_running() {
            tracing::debug!("profiler already running for {:?}; restarting", self.name);
            self.source.stop()?;
        }
        self.source.start()
    }

    /// Stop, redact and rename the output, re-render, then archive.
    ///
    /// A render failure is returned before anything is archived.
    pub fn finish(&mut self) -> CallscopeResult<SessionOutcome> {
        if self.source.is_running() {
            self.source.stop()?;
        }
        let raw = self.source.output(&self.renderer_config)?;
        let profile_json = rewrite_profile_json(&raw, &self.rules, Some(&self.name))?;

        self.view.set_profile(profile_json.clone());
        let diagram = self.view.recompute()?.to_string();
        let archived = self.ledger.record_session(&profile_json, &self.name, None)?;
        tracing::info!(
            "session {:?} finished: {} bytes of profile, archived={}",
            self.name,
            profile_json.len(),
            archived.is_some()
        );
        Ok(SessionOutcome {
            profile_json,
            diagram,
            archived,
        })
    }
}
