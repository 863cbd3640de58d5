//! Graph resource shapes, reduced to the fields cmgate reads.

use serde::Deserialize;

/// Any directory object; only the id is projected.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryObject {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub id: String,
    #[serde(default)]
    pub user_principal_name: Option<String>,
}

/// An Intune managed device.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDevice {
    pub id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub management_agent: Option<String>,
    #[serde(default)]
    pub device_enrollment_type: Option<String>,
}

impl ManagedDevice {
    /// Managed by both the ConfigMgr client and Intune MDM.
    #[must_use]
    pub fn is_co_managed(&self) -> bool {
        self.management_agent.as_deref() == Some("configurationManagerClientMdm")
            || self.device_enrollment_type.as_deref() == Some("windowsCoManagement")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCategory {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(agent: &str, enrollment: &str) -> ManagedDevice {
        serde_json::from_value(json!({
            "id": "d1",
            "managementAgent": agent,
            "deviceEnrollmentType": enrollment
        }))
        .unwrap()
    }

    #[test]
    fn test_co_management_detection() {
        assert!(device("configurationManagerClientMdm", "windowsAzureADJoin").is_co_managed());
        assert!(device("mdm", "windowsCoManagement").is_co_managed());
        assert!(!device("mdm", "windowsAzureADJoin").is_co_managed());
    }

    #[test]
    fn test_missing_optional_fields() {
        let device: ManagedDevice = serde_json::from_value(json!({"id": "d1"})).unwrap();
        assert!(!device.is_co_managed());
    }
}
