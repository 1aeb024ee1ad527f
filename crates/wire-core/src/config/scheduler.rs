//! Scheduler domain: polling cadence, report recipient and output folders

use super::null_as_empty;
use crate::settings::{ScalarBinding, Setting, SettingsDomain, SettingsRegistry};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Polling and reporting settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SchedulerConfig {
    /// Minutes between scheduled passes
    pub polling_interval: u32,
    /// Minutes of history each pass looks back over
    pub reporting_interval: u32,
    #[serde(deserialize_with = "null_as_empty")]
    pub report_email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub log_folder: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub report_folder: String,
}

impl SettingsDomain for SchedulerConfig {
    const DOMAIN: &'static str = "scheduler";

    fn registry() -> &'static SettingsRegistry<Self> {
        static REGISTRY: OnceLock<SettingsRegistry<SchedulerConfig>> = OnceLock::new();
        REGISTRY.get_or_init(build_registry)
    }
}

fn minutes(get: fn(&SchedulerConfig) -> i64, set: fn(&mut SchedulerConfig, i64)) -> ScalarBinding<SchedulerConfig> {
    ScalarBinding::Int {
        get,
        set,
        min: 0,
        max: i64::from(u32::MAX),
    }
}

fn build_registry() -> SettingsRegistry<SchedulerConfig> {
    SettingsRegistry::new(vec![
        Setting::scalar(
            "pollinginterval",
            "Polling Interval",
            "Minutes between scheduled checks of the work-item server.",
            minutes(
                |c| i64::from(c.polling_interval),
                |c, v| c.polling_interval = v as u32,
            ),
        ),
        Setting::scalar(
            "reportinginterval",
            "Reporting Interval",
            "Minutes of work-item history each check looks back over.",
            minutes(
                |c| i64::from(c.reporting_interval),
                |c, v| c.reporting_interval = v as u32,
            ),
        ),
        Setting::scalar(
            "reportemail",
            "Report EMail",
            "Address that receives the consolidated report after each check.",
            ScalarBinding::Text {
                get: |c| c.report_email.clone(),
                set: |c, v| c.report_email = v,
            },
        ),
        Setting::scalar(
            "reportfolder",
            "Report Folder",
            "Folder where report files are written.",
            ScalarBinding::Text {
                get: |c| c.report_folder.clone(),
                set: |c, v| c.report_folder = v,
            },
        ),
        Setting::scalar(
            "logfolder",
            "Log Folder",
            "Folder where log files are written.",
            ScalarBinding::Text {
                get: |c| c.log_folder.clone(),
                set: |c, v| c.log_folder = v,
            },
        ),
    ])
}
