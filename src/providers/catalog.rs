//! Service catalog: short service names as users say them, mapped to the
//! monitoring namespace and the billing service name.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub namespace: &'static str,
    pub billing_name: &'static str,
}

const SERVICES: &[(&str, &str, &str)] = &[
    ("EC2", "AWS/EC2", "Amazon Elastic Compute Cloud - Compute"),
    ("RDS", "AWS/RDS", "Amazon Relational Database Service"),
    ("S3", "AWS/S3", "Amazon Simple Storage Service"),
    ("Lambda", "AWS/Lambda", "AWS Lambda"),
    ("EBS", "AWS/EBS", "Amazon Elastic Block Store"),
    ("EKS", "AWS/EKS", "Amazon Elastic Kubernetes Service"),
    ("CloudFront", "AWS/CloudFront", "Amazon CloudFront"),
    ("DynamoDB", "AWS/DynamoDB", "Amazon DynamoDB"),
    ("ElastiCache", "AWS/ElastiCache", "Amazon ElastiCache"),
    ("Step Functions", "AWS/States", "AWS Step Functions"),
    ("API Gateway", "AWS/ApiGateway", "Amazon API Gateway"),
    ("Kinesis", "AWS/Kinesis", "Amazon Kinesis"),
    ("SNS", "AWS/SNS", "Amazon Simple Notification Service"),
    ("SQS", "AWS/SQS", "Amazon Simple Queue Service"),
    ("CloudTrail", "AWS/CloudTrail", "AWS CloudTrail"),
    ("Auto Scaling", "AWS/AutoScaling", "Auto Scaling"),
];

/// Lookup table over the known services. Names match exactly.
pub struct ServiceCatalog {
    entries: HashMap<&'static str, ServiceEntry>,
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        let entries = SERVICES
            .iter()
            .map(|&(name, namespace, billing_name)| {
                (
                    name,
                    ServiceEntry {
                        namespace,
                        billing_name,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl ServiceCatalog {
    pub fn get(&self, service: &str) -> Option<&ServiceEntry> {
        self.entries.get(service)
    }

    /// Monitoring namespace, if the service is known.
    pub fn namespace(&self, service: &str) -> Option<&'static str> {
        self.get(service).map(|e| e.namespace)
    }

    /// Billing name; unknown services are billed under their own name.
    pub fn billing_name<'a>(&self, service: &'a str) -> &'a str {
        match self.get(service) {
            Some(entry) => entry.billing_name,
            None => service,
        }
    }
}
