//! Stage configuration table (stages.toml) parser and validator.
//!
//! The table is the single input of the generator: an ordered list of
//! stages, each with one or more deployment groups (account + region).
//! It is parsed into a tagged schema that rejects unknown and missing
//! fields, then validated and flattened into [`DeploymentTarget`]s.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use humantime::format_duration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::types::*;

/// Stage table compiled into the binary.
const BUILTIN_TABLE: &str = include_str!("../stages.toml");

static ACCOUNT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{12}$").expect("valid regex"));
static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d$").expect("valid regex"));
static STAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid regex"));

const MAX_DELIVERY_DELAY: Duration = Duration::from_secs(900);
const MAX_BATCHING_WINDOW: Duration = Duration::from_secs(300);
const MAX_BATCH_SIZE: u32 = 10_000;
/// Queue sources need a batching window once the batch exceeds this size.
const MAX_BATCH_WITHOUT_WINDOW: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageTable {
    pub application: String,
    pub pipeline: PipelineMeta,
    pub team: TeamContact,
    pub artifacts: ArtifactConfig,
    pub stages: Vec<StageConfig>,
}

/// Where the deployment pipeline itself lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineMeta {
    pub name: String,
    pub account_id: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub is_production: bool,
    #[serde(default)]
    pub setup_alarms: bool,
    /// Keyed by event type: "ingest", "inference", "click-through".
    pub queues: BTreeMap<String, QueueTuning>,
    /// Keyed by function name, e.g. "IngestEventsLambda".
    pub functions: BTreeMap<String, BatchTuning>,
    pub deployment_groups: Vec<DeploymentGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentGroup {
    pub account_id: String,
    pub region: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default = "default_true")]
    pub enable_ticketing: bool,
    #[serde(default = "default_true")]
    pub deploy_model_hosting: bool,
}

fn default_true() -> bool {
    true
}

impl StageTable {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a stage table.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let table: StageTable = toml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    /// The Devo/Prod table shipped with the binary.
    pub fn builtin() -> ConfigResult<Self> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every invariant the generator relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        check_account(&self.pipeline.account_id)?;
        check_region(&self.pipeline.region)?;
        self.validate_team()?;

        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !STAGE_NAME.is_match(&stage.name) {
                return Err(ConfigError::InvalidStageName(stage.name.clone()));
            }
            if stage.deployment_groups.is_empty() {
                return Err(ConfigError::NoDeploymentGroups(stage.name.clone()));
            }
            for group in &stage.deployment_groups {
                check_account(&group.account_id)?;
                check_region(&group.region)?;
                // Physical names lowercase the stage, so case alone does not separate targets.
                if !seen.insert((stage.name.to_ascii_lowercase(), group.region.as_str())) {
                    return Err(ConfigError::DuplicateTarget {
                        stage: stage.name.clone(),
                        region: group.region.clone(),
                    });
                }
                if group.enable_ticketing && !stage.is_production {
                    debug!(
                        stage = %stage.name,
                        region = %group.region,
                        "ticketing requested on a non-production stage; it stays off"
                    );
                }
            }
            stage.queue_tuning()?;
            stage.batch_tuning()?;
            if stage.is_production && !stage.setup_alarms {
                warn!(stage = %stage.name, "production stage without alarms");
            }
        }
        Ok(())
    }

    fn validate_team(&self) -> ConfigResult<()> {
        let fields = [
            ("alias", &self.team.alias),
            ("cti", &self.team.cti),
            ("resolver_group", &self.team.resolver_group),
            ("runbook_url", &self.team.runbook_url),
            ("ticketing_endpoint", &self.team.ticketing_endpoint),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyTeamField(name));
            }
        }
        if let Some(account) = &self.team.dashboards_account {
            check_account(account)?;
        }
        Ok(())
    }

    /// Flatten the table into deployment targets, in table order.
    pub fn targets(&self) -> ConfigResult<Vec<DeploymentTarget>> {
        self.validate()?;
        let mut targets = Vec::new();
        for stage in &self.stages {
            let queue_config = stage.queue_tuning()?;
            let compute_config = stage.batch_tuning()?;
            for group in &stage.deployment_groups {
                targets.push(DeploymentTarget {
                    account_id: group.account_id.clone(),
                    region: group.region.clone(),
                    stage_name: stage.name.clone(),
                    is_production: stage.is_production,
                    setup_alarms: stage.setup_alarms,
                    channel: group.channel,
                    queue_config: queue_config.clone(),
                    compute_config: compute_config.clone(),
                    approval: group.approval.clone(),
                    enable_ticketing: group.enable_ticketing,
                    deploy_model_hosting: group.deploy_model_hosting,
                });
            }
        }
        Ok(targets)
    }
}

impl StageConfig {
    /// Typed queue tuning; every event type must be present.
    fn queue_tuning(&self) -> ConfigResult<BTreeMap<EventType, QueueTuning>> {
        let mut out = BTreeMap::new();
        for (key, tuning) in &self.queues {
            let event = EventType::from_key(key).ok_or_else(|| ConfigError::UnknownQueue {
                stage: self.name.clone(),
                key: key.clone(),
            })?;
            self.check_whole_secs("delivery_delay", key, tuning.delivery_delay)?;
            if tuning.delivery_delay > MAX_DELIVERY_DELAY {
                return Err(self.out_of_range(
                    "delivery_delay",
                    format!(
                        "{key}: {} exceeds {}",
                        format_duration(tuning.delivery_delay),
                        format_duration(MAX_DELIVERY_DELAY)
                    ),
                ));
            }
            out.insert(event, tuning.clone());
        }
        for event in EventType::ALL {
            if !out.contains_key(&event) {
                return Err(ConfigError::MissingQueueTuning {
                    stage: self.name.clone(),
                    queue: event,
                });
            }
        }
        Ok(out)
    }

    /// Typed batch tuning; every function must be present.
    fn batch_tuning(&self) -> ConfigResult<BTreeMap<FunctionKind, BatchTuning>> {
        let mut out = BTreeMap::new();
        for (name, tuning) in &self.functions {
            let function = FunctionKind::from_name(name).ok_or_else(|| ConfigError::UnknownFunction {
                stage: self.name.clone(),
                name: name.clone(),
            })?;
            if tuning.batch_size == 0 || tuning.batch_size > MAX_BATCH_SIZE {
                return Err(self.out_of_range(
                    "batch_size",
                    format!("{name}: {} not in 1..={MAX_BATCH_SIZE}", tuning.batch_size),
                ));
            }
            self.check_whole_secs("max_batching_window", name, tuning.max_batching_window)?;
            if tuning.max_batching_window > MAX_BATCHING_WINDOW {
                return Err(self.out_of_range(
                    "max_batching_window",
                    format!(
                        "{name}: {} exceeds {}",
                        format_duration(tuning.max_batching_window),
                        format_duration(MAX_BATCHING_WINDOW)
                    ),
                ));
            }
            if tuning.batch_size > MAX_BATCH_WITHOUT_WINDOW && tuning.max_batching_window.as_secs() == 0 {
                return Err(self.out_of_range(
                    "max_batching_window",
                    format!("{name}: batch size {} needs a batching window", tuning.batch_size),
                ));
            }
            out.insert(function, tuning.clone());
        }
        for function in FunctionKind::ALL {
            if !out.contains_key(&function) {
                return Err(ConfigError::MissingBatchTuning {
                    stage: self.name.clone(),
                    function,
                });
            }
        }
        Ok(out)
    }

    /// Templates carry whole seconds; a fractional value would be truncated.
    fn check_whole_secs(&self, field: &'static str, key: &str, value: Duration) -> ConfigResult<()> {
        if value.subsec_nanos() == 0 {
            return Ok(());
        }
        Err(self.out_of_range(
            field,
            format!("{key}: {} is not a whole number of seconds", format_duration(value)),
        ))
    }

    fn out_of_range(&self, field: &'static str, detail: String) -> ConfigError {
        ConfigError::OutOfRange {
            stage: self.name.clone(),
            field,
            detail,
        }
    }
}

fn check_account(account_id: &str) -> ConfigResult<()> {
    if ACCOUNT_ID.is_match(account_id) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAccountId(account_id.to_string()))
    }
}

fn check_region(region: &str) -> ConfigResult<()> {
    if REGION.is_match(region) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRegion(region.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
application = "OrderScoring"

[pipeline]
name = "OrderScoringPipeline"
account_id = "111122223333"
region = "eu-west-1"

[team]
alias = "order-scoring"
cti = "Risk/OrderScoring/Realtime"
resolver_group = "order-scoring-oncall"
runbook_url = "https://runbooks.example.com/order-scoring"
ticketing_endpoint = "https://tickets.example.com/hooks/alarms"

[artifacts]
stream_repository = "order-scoring-stream"
experiment_repository = "order-scoring-experiments"
model_repository = "order-scoring-model"
tag = "latest"
model_data_url = "s3://order-scoring-artifacts/OrderScoringModel/20220125.tar.gz"

[[stages]]
name = "Devo"

[stages.queues.ingest]
delivery_delay = "0s"
[stages.queues.inference]
delivery_delay = "0s"
[stages.queues.click-through]
delivery_delay = "0s"

[stages.functions.IngestEventsLambda]
batch_size = 2
max_batching_window = "10s"
[stages.functions.InferenceEventsLambda]
batch_size = 2
max_batching_window = "10s"
[stages.functions.ClickThroughLambda]
batch_size = 2
max_batching_window = "10s"

[[stages.deployment_groups]]
account_id = "111122223333"
region = "us-east-1"
channel = "experiment"
"#;

    #[test]
    fn parse_minimal() {
        let table = StageTable::from_toml_str(MINIMAL).unwrap();
        assert_eq!(table.stages.len(), 1);
        let targets = table.targets().unwrap();
        assert_eq!(targets.len(), 1);
        let t = &targets[0];
        assert_eq!(t.suffix(), "Devo-us-east-1");
        assert_eq!(t.channel, Channel::Experiment);
        assert!(!t.setup_alarms);
        assert!(!t.approval.run_integration_tests);
        assert!(t.deploy_model_hosting);
        assert_eq!(t.batch_tuning(FunctionKind::Inference).unwrap().batch_size, 2);
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = StageTable::builtin().unwrap();
        let targets = table.targets().unwrap();
        let suffixes: Vec<String> = targets.iter().map(|t| t.suffix()).collect();
        assert_eq!(suffixes, vec!["Devo-eu-west-1", "Devo-us-east-1", "Prod-eu-west-1"]);
        let prod = &targets[2];
        assert!(prod.is_production && prod.setup_alarms && prod.ticketing_enabled());
        assert_eq!(
            prod.queue_tuning(EventType::ClickThrough).unwrap().delivery_delay,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let bad = MINIMAL.replace("channel = \"experiment\"", "channel = \"experiment\"\ncolour = \"blue\"");
        assert!(matches!(StageTable::from_toml_str(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn mistyped_field_rejected() {
        let bad = MINIMAL.replacen("batch_size = 2", "batch_size = \"two\"", 1);
        assert!(matches!(StageTable::from_toml_str(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_function_tuning_rejected() {
        let bad = MINIMAL.replace(
            "[stages.functions.ClickThroughLambda]\nbatch_size = 2\nmax_batching_window = \"10s\"\n",
            "",
        );
        let err = StageTable::from_toml_str(&bad).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingBatchTuning { function: FunctionKind::ClickThrough, .. }
        ));
    }

    #[test]
    fn unknown_queue_rejected() {
        let bad = MINIMAL.replace("[stages.queues.inference]", "[stages.queues.scoring]");
        let err = StageTable::from_toml_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownQueue { .. }));
    }

    #[test]
    fn duplicate_stage_region_rejected() {
        let dup = format!(
            "{MINIMAL}\n[[stages.deployment_groups]]\naccount_id = \"444455556666\"\nregion = \"us-east-1\"\n"
        );
        let err = StageTable::from_toml_str(&dup).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTarget { .. }));
    }

    #[test]
    fn invalid_account_and_region_rejected() {
        let bad = MINIMAL.replace("account_id = \"111122223333\"\nregion = \"us-east-1\"", "account_id = \"1234\"\nregion = \"us-east-1\"");
        assert!(matches!(StageTable::from_toml_str(&bad), Err(ConfigError::InvalidAccountId(_))));

        let bad = MINIMAL.replace("region = \"us-east-1\"", "region = \"mars-north\"");
        assert!(matches!(StageTable::from_toml_str(&bad), Err(ConfigError::InvalidRegion(_))));
    }

    #[test]
    fn batching_window_bounds() {
        let bad = MINIMAL.replacen("max_batching_window = \"10s\"", "max_batching_window = \"6m\"", 1);
        assert!(matches!(
            StageTable::from_toml_str(&bad),
            Err(ConfigError::OutOfRange { field: "max_batching_window", .. })
        ));

        let bad = MINIMAL.replacen(
            "batch_size = 2\nmax_batching_window = \"10s\"",
            "batch_size = 50\nmax_batching_window = \"0s\"",
            1,
        );
        assert!(matches!(
            StageTable::from_toml_str(&bad),
            Err(ConfigError::OutOfRange { field: "max_batching_window", .. })
        ));
    }

    #[test]
    fn subsecond_durations_rejected() {
        let bad = MINIMAL.replacen(
            "batch_size = 2\nmax_batching_window = \"10s\"",
            "batch_size = 500\nmax_batching_window = \"500ms\"",
            1,
        );
        assert!(matches!(
            StageTable::from_toml_str(&bad),
            Err(ConfigError::OutOfRange { field: "max_batching_window", .. })
        ));

        let bad = MINIMAL.replacen("max_batching_window = \"10s\"", "max_batching_window = \"10s 250ms\"", 1);
        assert!(matches!(
            StageTable::from_toml_str(&bad),
            Err(ConfigError::OutOfRange { field: "max_batching_window", .. })
        ));

        let bad = MINIMAL.replacen("delivery_delay = \"0s\"", "delivery_delay = \"1500ms\"", 1);
        assert!(matches!(
            StageTable::from_toml_str(&bad),
            Err(ConfigError::OutOfRange { field: "delivery_delay", .. })
        ));
    }

    #[test]
    fn humantime_durations_parsed() {
        let table = StageTable::from_toml_str(&MINIMAL.replacen(
            "max_batching_window = \"10s\"",
            "max_batching_window = \"1m 30s\"",
            1,
        ))
        .unwrap();
        let targets = table.targets().unwrap();
        assert_eq!(
            targets[0].batch_tuning(FunctionKind::Ingest).unwrap().max_batching_window,
            Duration::from_secs(90)
        );

        let bad = MINIMAL.replacen("delivery_delay = \"0s\"", "delivery_delay = \"soon\"", 1);
        assert!(matches!(StageTable::from_toml_str(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn stage_names_differing_in_case_collide() {
        let dup = format!(
            "{MINIMAL}\n[[stages]]\nname = \"devo\"\n{}",
            &MINIMAL[MINIMAL.find("[stages.queues.ingest]").unwrap()..]
        );
        let err = StageTable::from_toml_str(&dup).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTarget { ref stage, .. } if stage == "devo"));
    }

    #[test]
    fn delivery_delay_bounds() {
        let bad = MINIMAL.replacen("delivery_delay = \"0s\"", "delivery_delay = \"16m\"", 1);
        assert!(matches!(
            StageTable::from_toml_str(&bad),
            Err(ConfigError::OutOfRange { field: "delivery_delay", .. })
        ));
    }

    #[test]
    fn empty_team_field_rejected() {
        let bad = MINIMAL.replace("cti = \"Risk/OrderScoring/Realtime\"", "cti = \"  \"");
        assert!(matches!(StageTable::from_toml_str(&bad), Err(ConfigError::EmptyTeamField("cti"))));
    }

    #[test]
    fn toml_roundtrip_preserves_table() {
        let table = StageTable::builtin().unwrap();
        let rendered = table.to_toml_string().unwrap();
        let back = StageTable::from_toml_str(&rendered).unwrap();
        assert_eq!(back, table);
    }
}
