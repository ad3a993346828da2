//! Audience identifiers.
//!
//! An audience is stored in state as a colon-delimited, lowercase string:
//!
//! ```text
//! <service>:<operation type>:<operation>:<component>
//! ```
//!
//! The operation type segment is the lowercased protobuf value name, e.g.
//! `operation_type_consumer`. The short configuration name (`consumer`) is
//! accepted when parsing.

use crate::enums::ProtoEnum;
use crate::proto::streamdal::{Audience, OperationType};

/// Render an audience as its identifier string.
pub fn to_id(audience: &Audience) -> String {
    format!(
        "{}:{}:{}:{}",
        audience.service_name,
        audience.operation_type().proto_name(),
        audience.operation_name,
        audience.component_name
    )
    .to_lowercase()
}

/// Parse an identifier string.
///
/// Returns `None` for an empty string, a string without exactly four
/// segments, or an unknown operation type.
pub fn from_id(id: &str) -> Option<Audience> {
    if id.is_empty() {
        return None;
    }

    let parts: Vec<&str> = id.split(':').collect();
    let [service, op_type, operation, component] = parts.as_slice() else {
        return None;
    };

    let op_type = parse_operation_type(op_type)?;

    Some(Audience {
        service_name: service.to_lowercase(),
        component_name: component.to_lowercase(),
        operation_type: op_type as i32,
        operation_name: operation.to_lowercase(),
    })
}

/// Accepts both `operation_type_consumer` and `consumer`.
pub fn parse_operation_type(s: &str) -> Option<OperationType> {
    OperationType::from_proto_name(&s.to_uppercase()).or_else(|| OperationType::from_name(s))
}

/// Two audiences are the same when their identifiers are equal.
pub fn same(a: &Audience, b: &Audience) -> bool {
    to_id(a) == to_id(b)
}

/// Whether `audience` appears in `list`.
pub fn contains(list: &[Audience], audience: &Audience) -> bool {
    list.iter().any(|a| same(a, audience))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audience(service: &str, component: &str, op_type: OperationType, op: &str) -> Audience {
        Audience {
            service_name: service.to_string(),
            component_name: component.to_string(),
            operation_type: op_type as i32,
            operation_name: op.to_string(),
        }
    }

    #[test]
    fn test_to_id_format() {
        let aud = audience("Billing", "kafka-orders", OperationType::Consumer, "Read-Orders");
        assert_eq!(
            to_id(&aud),
            "billing:operation_type_consumer:read-orders:kafka-orders"
        );
    }

    #[test]
    fn test_round_trip_after_lowercasing() {
        for op_type in OperationType::VARIANTS {
            let aud = audience("Svc", "Comp", *op_type, "Op");
            let parsed = from_id(&to_id(&aud)).expect("valid id");
            assert_eq!(parsed.service_name, "svc");
            assert_eq!(parsed.component_name, "comp");
            assert_eq!(parsed.operation_name, "op");
            assert_eq!(parsed.operation_type(), *op_type);
            assert_eq!(to_id(&parsed), to_id(&aud));
        }
    }

    #[test]
    fn test_from_id_accepts_short_operation_type() {
        let parsed = from_id("svc:producer:op:comp").expect("valid id");
        assert_eq!(parsed.operation_type(), OperationType::Producer);
    }

    #[test]
    fn test_from_id_rejects_malformed() {
        assert!(from_id("").is_none());
        assert!(from_id("svc:consumer:op").is_none());
        assert!(from_id("svc:consumer:op:comp:extra").is_none());
        assert!(from_id("svc:sideways:op:comp").is_none());
    }

    #[test]
    fn test_same_ignores_case() {
        let a = audience("svc", "comp", OperationType::Consumer, "op");
        let b = audience("SVC", "Comp", OperationType::Consumer, "OP");
        let c = audience("svc", "comp", OperationType::Producer, "op");
        assert!(same(&a, &b));
        assert!(!same(&a, &c));
        assert!(contains(&[c.clone(), b.clone()], &a));
        assert!(!contains(&[c], &a));
    }
}
