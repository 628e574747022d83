//! Price List `GetProducts` query for on-demand Linux EC2 capacity

pub const SERVICE_CODE: &str = "AmazonEC2";
pub const FORMAT_VERSION: &str = "aws_v1";
pub const MAX_RESULTS: i32 = 99;

/// A `TERM_MATCH` filter on one product attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub field: &'static str,
    pub value: String,
}

/// Query for the on-demand price of one instance type in one region.
///
/// Built fresh for every lookup; the fixed terms select shared-tenancy Linux
/// with no bundled license or pre-installed software.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingQuery {
    pub service_code: &'static str,
    pub region_code: String,
    pub instance_type: String,
    pub operating_system: &'static str,
    pub market_option: &'static str,
    pub license_model: &'static str,
    pub pre_installed_software: &'static str,
    pub format_version: &'static str,
    pub max_results: i32,
}

impl PricingQuery {
    pub fn on_demand_linux(region_code: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            service_code: SERVICE_CODE,
            region_code: region_code.into(),
            instance_type: instance_type.into(),
            operating_system: "Linux",
            market_option: "OnDemand",
            license_model: "No License required",
            pre_installed_software: "NA",
            format_version: FORMAT_VERSION,
            max_results: MAX_RESULTS,
        }
    }

    pub fn filters(&self) -> Vec<TermMatch> {
        let term = |field: &'static str, value: &str| TermMatch {
            field,
            value: value.to_string(),
        };
        vec![
            term("ServiceCode", self.service_code),
            term("regionCode", &self.region_code),
            term("marketoption", self.market_option),
            term("instanceType", &self.instance_type),
            term("operatingSystem", self.operating_system),
            term("licenseModel", self.license_model),
            term("preInstalledSw", self.pre_installed_software),
        ]
    }
}
