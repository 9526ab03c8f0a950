use std::sync::LazyLock;

use regex::Regex;

use crate::error::DefinitionError;

static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^arn:(?P<partition>[A-Za-z0-9-]+):states:",
        r"(?P<region>[A-Za-z0-9-]*):(?P<account>[0-9]*):",
        r"(?P<service>[a-z0-9-]+):(?P<action>[A-Za-z][A-Za-z0-9]*)",
        r"(?:\.(?P<pattern>[A-Za-z0-9:]+))?$",
    ))
    .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationPattern {
    /// Call the action and continue with its response.
    RequestResponse,
    /// Call the action, then suspend until a task token is completed.
    WaitForTaskToken,
}

/// A service-integration resource such as
/// `arn:aws:states:::batch:submitJob.waitForTaskToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    raw: String,
    pub partition: String,
    pub region: Option<String>,
    pub account: Option<String>,
    pub service_name: String,
    pub api_action: String,
    pub pattern: IntegrationPattern,
}

/// Where a resource is invoked, after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRuntimePart {
    pub region: String,
    pub account: String,
}

impl Resource {
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        let caps = RESOURCE_RE
            .captures(raw.trim())
            .ok_or_else(|| DefinitionError::InvalidResource(raw.to_string()))?;

        let pattern = match caps.name("pattern").map(|m| m.as_str()) {
            None => IntegrationPattern::RequestResponse,
            Some("waitForTaskToken") => IntegrationPattern::WaitForTaskToken,
            Some(other) => {
                return Err(DefinitionError::UnsupportedPattern {
                    resource: raw.to_string(),
                    pattern: other.to_string(),
                })
            }
        };
        let non_empty = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            raw: raw.trim().to_string(),
            partition: caps["partition"].to_string(),
            region: non_empty("region"),
            account: non_empty("account"),
            service_name: caps["service"].to_string(),
            api_action: caps["action"].to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value reported as `resourceType` in task history events.
    pub fn resource_type(&self) -> &str {
        &self.service_name
    }

    /// Value reported as `resource` in task history events.
    pub fn resource(&self) -> String {
        match self.pattern {
            IntegrationPattern::RequestResponse => self.api_action.clone(),
            IntegrationPattern::WaitForTaskToken => format!("{}.waitForTaskToken", self.api_action),
        }
    }

    pub fn runtime_part(&self, default_region: &str, default_account: &str) -> ResourceRuntimePart {
        ResourceRuntimePart {
            region: self.region.clone().unwrap_or_else(|| default_region.to_string()),
            account: self.account.clone().unwrap_or_else(|| default_account.to_string()),
        }
    }

    /// The action in the backend's invocation style, e.g. `submitJob` -> `submit_job`.
    pub fn normalized_action(&self) -> String {
        camel_to_snake_case(&self.api_action)
    }
}

pub fn camel_to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
