//! Fixed value pools for enumerated fields and generated fallbacks.

pub const CRITICALITY: &[&str] = &["Low", "Medium", "High"];
pub const LIFECYCLE: &[&str] = &["Active", "Legacy", "Decommissioning"];
pub const ENVIRONMENT: &[&str] = &["DEV", "UAT", "PROD"];
pub const HOSTING: &[&str] = &["on-prem", "cloud", "hybrid"];
pub const SENSITIVITY: &[&str] = &["Low", "Medium", "High"];
pub const INTEGRATION_TYPE: &[&str] = &["API", "file", "message"];
pub const DIRECTION: &[&str] = &["sync", "async"];

pub const BUSINESS_OWNERS: &[&str] = &[
    "Head of Payments",
    "Head of Retail Banking",
    "Head of Risk",
    "Head of Compliance",
    "Head of Treasury",
    "Head of CRM",
    "Head of Data",
    "Head of Security",
];

pub const IT_OWNERS: &[&str] = &[
    "IT Ops Lead",
    "Platform Lead",
    "Integration Lead",
    "Data Engineering Lead",
    "App Support Lead",
    "Cloud Lead",
    "Security Engineering Lead",
];

pub const DB_TECHNOLOGIES: &[&str] = &[
    "PostgreSQL",
    "Oracle",
    "MS SQL Server",
    "MySQL",
    "MongoDB",
    "DB2",
    "SQLite",
];

pub const VENDOR_PRODUCTS: &[&str] = &[
    "SAP PI/PO",
    "IBM MQ",
    "Kafka",
    "MuleSoft",
    "Apigee",
    "Temenos T24",
    "Oracle Exadata",
    "Azure Service Bus",
    "AWS SQS",
    "Elastic Stack",
];

pub const CAPABILITIES: &[&str] = &[
    "Customer Onboarding",
    "KYC/AML Screening",
    "Payments Processing",
    "Card Management",
    "Loan Origination",
    "Fraud Detection",
    "Reporting & BI",
    "Document Management",
    "Customer Support",
    "Authentication/SSO",
];

pub const DEBT_CATEGORIES: &[&str] = &[
    "Security",
    "Upgrade",
    "Performance",
    "CodeQuality",
    "Observability",
    "Reliability",
];
pub const DEBT_STATUSES: &[&str] = &["Open", "InProgress", "Done", "WontFix"];

pub const TRANSPORTS: &[&str] = &["REST", "SOAP", "SFTP", "Kafka", "IBM MQ", "gRPC", "Webhooks"];
pub const FREQUENCIES: &[&str] = &["realtime", "hourly", "daily", "weekly", "batch-nightly"];

/// Inclusive range of daily volumes for synthesized integrations.
pub const VOLUME_RANGE: std::ops::RangeInclusive<i64> = 1_000..=300_000;
