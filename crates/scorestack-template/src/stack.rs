//! Stacks: named resource groups bound to one account and region.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::resource::{Resource, ResourceKind};
use crate::value::Value;

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Account and region a stack deploys into.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Environment {
    pub account_id: String,
    pub region: String,
}

impl Environment {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    /// `aws://{account}/{region}`, as recorded in the manifest.
    pub fn uri(&self) -> String {
        format!("aws://{}/{}", self.account_id, self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportName {
    pub name: String,
}

/// Strip everything but ASCII alphanumerics: `"Flow-Log_1"` -> `"FlowLog1"`.
pub fn logical_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// One deployable resource group.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub id: String,
    pub env: Environment,
    pub description: String,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
    dependencies: BTreeSet<String>,
    tags: BTreeMap<String, String>,
}

impl Stack {
    pub fn new(id: impl Into<String>, env: Environment, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            env,
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            dependencies: BTreeSet::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Declare a resource. Returns a `Ref` to it.
    ///
    /// Rejects non-alphanumeric and duplicate logical ids, and a second
    /// resource of the same type with the same physical name.
    pub fn add(&mut self, logical_id: impl Into<String>, resource: Resource) -> TemplateResult<Value> {
        let logical_id = logical_id.into();
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TemplateError::InvalidLogicalId(logical_id));
        }
        if self.resources.contains_key(&logical_id) {
            return Err(TemplateError::DuplicateLogicalId {
                stack: self.id.clone(),
                logical_id,
            });
        }
        if let Some(name) = resource.kind.physical_name() {
            let type_name = resource.type_name();
            let clash = self
                .resources
                .values()
                .any(|r| r.type_name() == type_name && r.kind.physical_name() == Some(name));
            if clash {
                return Err(TemplateError::DuplicatePhysicalName {
                    stack: self.id.clone(),
                    type_name,
                    name: name.to_string(),
                });
            }
        }
        debug!(stack = %self.id, logical_id = %logical_id, kind = resource.type_name(), "declared resource");
        self.resources.insert(logical_id.clone(), resource);
        Ok(Value::Ref(logical_id))
    }

    /// Plain (non-exported) output.
    pub fn output(
        &mut self,
        name: impl Into<String>,
        value: Value,
        description: Option<String>,
    ) -> TemplateResult<()> {
        let name = name.into();
        self.insert_output(
            name,
            Output {
                value,
                description,
                export: None,
            },
        )
    }

    /// Export a value for other stacks of the same environment. Returns
    /// the `ImportValue` consumers should use.
    pub fn export(&mut self, name: impl Into<String>, value: Value) -> TemplateResult<Value> {
        let name = name.into();
        let export_name = format!("{}-{name}", self.id);
        self.insert_output(
            name,
            Output {
                value,
                description: None,
                export: Some(ExportName {
                    name: export_name.clone(),
                }),
            },
        )?;
        Ok(Value::Import(export_name))
    }

    fn insert_output(&mut self, name: String, output: Output) -> TemplateResult<()> {
        if self.outputs.contains_key(&name) {
            return Err(TemplateError::DuplicateOutput {
                stack: self.id.clone(),
                output: name,
            });
        }
        self.outputs.insert(name, output);
        Ok(())
    }

    /// Record that this stack deploys after `stack_id`.
    pub fn add_dependency(&mut self, stack_id: impl Into<String>) -> TemplateResult<()> {
        let stack_id = stack_id.into();
        if stack_id == self.id {
            return Err(TemplateError::SelfDependency(stack_id));
        }
        self.dependencies.insert(stack_id);
        Ok(())
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Resources of one provider type, in logical-id order.
    pub fn resources_of_type(&self, type_name: &str) -> Vec<(&str, &Resource)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.type_name() == type_name)
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    /// Property structs of every resource matching `select`.
    pub fn collect<'a, T>(&'a self, select: impl Fn(&'a ResourceKind) -> Option<&'a T>) -> Vec<&'a T> {
        self.resources.values().filter_map(|r| select(&r.kind)).collect()
    }

    /// Check that every `DependsOn`, `Ref` and `GetAtt` names a resource
    /// of this stack.
    pub fn validate(&self) -> TemplateResult<()> {
        for (id, resource) in &self.resources {
            for dep in &resource.depends_on {
                if !self.resources.contains_key(dep) {
                    return Err(TemplateError::DanglingDependsOn {
                        stack: self.id.clone(),
                        resource: id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
            let rendered = serde_json::to_value(&resource.kind)?;
            let mut refs = Vec::new();
            collect_refs(&rendered, &mut refs);
            for target in refs {
                if !self.resources.contains_key(&target) {
                    return Err(TemplateError::DanglingReference {
                        stack: self.id.clone(),
                        resource: id.clone(),
                        missing: target,
                    });
                }
            }
        }
        for output in self.outputs.values() {
            for target in output.value.local_refs() {
                if !self.resources.contains_key(target) {
                    return Err(TemplateError::DanglingReference {
                        stack: self.id.clone(),
                        resource: "Outputs".to_string(),
                        missing: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Render the provider template.
    pub fn to_template(&self) -> TemplateResult<serde_json::Value> {
        self.validate()?;
        let mut template = json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": self.description,
            "Resources": serde_json::to_value(&self.resources)?,
        });
        if !self.outputs.is_empty() {
            template["Outputs"] = serde_json::to_value(&self.outputs)?;
        }
        Ok(template)
    }

    pub fn to_template_string(&self) -> TemplateResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_template()?)?)
    }
}

/// In-stack logical ids referenced by `Ref`/`Fn::GetAtt`, skipping
/// pseudo parameters such as `AWS::Region`.
fn collect_refs(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    out.push(target.clone());
                }
            }
            if let Some(serde_json::Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(serde_json::Value::String(target)) = args.first() {
                    out.push(target.clone());
                }
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{EventBusProperties, LogGroupProperties, RouteTableProperties};

    fn stack() -> Stack {
        Stack::new("Network-Devo-eu-west-1", Environment::new("111122223333", "eu-west-1"), "net")
    }

    fn log_group(name: &str) -> Resource {
        Resource::new(LogGroupProperties {
            log_group_name: name.to_string(),
            retention_in_days: 30,
        })
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut s = stack();
        s.add("Logs", log_group("a")).unwrap();
        let err = s.add("Logs", log_group("b")).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateLogicalId { .. }));

        let err = s.add("Logs2", log_group("a")).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicatePhysicalName { .. }));
    }

    #[test]
    fn add_rejects_bad_logical_ids() {
        let mut s = stack();
        assert!(matches!(
            s.add("Flow-Log", log_group("a")).unwrap_err(),
            TemplateError::InvalidLogicalId(_)
        ));
        assert_eq!(logical_id("Flow-Log_1"), "FlowLog1");
    }

    #[test]
    fn same_physical_name_different_type_is_fine() {
        let mut s = stack();
        s.add("Logs", log_group("Shared")).unwrap();
        s.add(
            "Bus",
            Resource::new(EventBusProperties {
                name: "Shared".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(s.resources().len(), 2);
        assert_eq!(s.resources_of_type("AWS::Logs::LogGroup").len(), 1);
    }

    #[test]
    fn export_returns_import() {
        let mut s = stack();
        let vpc = s.add("Logs", log_group("a")).unwrap();
        let imported = s.export("LogsName", vpc).unwrap();
        assert_eq!(imported, Value::import("Network-Devo-eu-west-1-LogsName"));
        assert!(s.export("LogsName", Value::str("x")).is_err());
    }

    #[test]
    fn dangling_refs_fail_validation() {
        let mut s = stack();
        s.add(
            "Routes",
            Resource::new(RouteTableProperties {
                vpc_id: Value::reference("Vpc"),
                tags: Vec::new(),
            }),
        )
        .unwrap();
        assert!(matches!(
            s.to_template().unwrap_err(),
            TemplateError::DanglingReference { .. }
        ));

        let mut s = stack();
        s.add("Logs", log_group("a").depends_on("Missing")).unwrap();
        assert!(matches!(
            s.validate().unwrap_err(),
            TemplateError::DanglingDependsOn { .. }
        ));
    }

    #[test]
    fn template_shape() {
        let mut s = stack();
        let logs = s.add("Logs", log_group("a")).unwrap();
        s.export("LogsName", logs).unwrap();
        s.add_dependency("Other").unwrap();
        assert!(s.add_dependency("Network-Devo-eu-west-1").is_err());

        let t = s.to_template().unwrap();
        assert_eq!(t["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(t["Resources"]["Logs"]["Type"], "AWS::Logs::LogGroup");
        assert_eq!(
            t["Outputs"]["LogsName"]["Export"]["Name"],
            "Network-Devo-eu-west-1-LogsName"
        );
        assert_eq!(t["Outputs"]["LogsName"]["Value"], json!({"Ref": "Logs"}));
    }
}
