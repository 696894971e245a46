//! controlSmartHome: simulated device control

use super::{param_or, Tool, ToolContext};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

const DEVICES: &[(&str, &[&str])] = &[
    ("lights", &["on", "off", "dim", "bright"]),
    ("temperature", &["increase", "decrease", "set"]),
    ("security", &["arm", "disarm", "status"]),
    ("music", &["play", "pause", "next", "previous"]),
];

pub fn supports(device: &str, action: &str) -> bool {
    DEVICES
        .iter()
        .any(|(d, actions)| *d == device && actions.contains(&action))
}

pub struct ControlSmartHome;

#[async_trait]
impl Tool for ControlSmartHome {
    fn name(&self) -> &'static str {
        "controlSmartHome"
    }

    fn description(&self) -> &'static str {
        "Control lights, temperature, security or music (device, action)"
    }

    fn error_label(&self) -> &'static str {
        "Smart Home error"
    }

    async fn call(&self, params: &Value, _ctx: &ToolContext) -> Result<String> {
        let device = param_or(params, "device", "").to_lowercase();
        let action = param_or(params, "action", "").to_lowercase();

        if supports(&device, &action) {
            Ok(format!("Smart Home: {} {} executed successfully", device, action))
        } else {
            Ok("Smart Home: Unknown device or action".to_string())
        }
    }
}
