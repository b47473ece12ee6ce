//! Multi-property request compiler
//!
//! Turns a flat, ordered stream of object and property tokens into the
//! per-object blocks of one ReadPropertyMultiple request. An object token
//! opens a block; the property tokens after it fill the block until the next
//! token that looks like an object identifier (contains `:` or `,`).

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

use super::reference::{self, PropertyReference};
use super::schema::{ObjectClass, VendorSchema};
use super::stack::PropertyRequestBlock;
use super::vocabulary::is_wildcard_property;

/// Flatten `(object, property)` pairs into a token stream, in pair order
pub fn flatten_pairs<'a, I>(pairs: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .flat_map(|(object, property)| [object, property])
        .collect()
}

/// Compile a token stream into request blocks
///
/// Any unknown object type or undeclared property fails the whole compile.
pub fn compile<S: AsRef<str>>(
    schema: &dyn VendorSchema,
    vendor_id: u16,
    tokens: &[S],
) -> GatewayResult<Vec<PropertyRequestBlock>> {
    let blocks = parse_tokens(schema, tokens)?;
    check_blocks(schema, vendor_id, &blocks)?;
    Ok(blocks)
}

/// Group a token stream into blocks, checking token syntax only
///
/// Needs no device: object classes are looked up later by `check_blocks`,
/// once the vendor is known.
pub fn parse_tokens<S: AsRef<str>>(
    schema: &dyn VendorSchema,
    tokens: &[S],
) -> GatewayResult<Vec<PropertyRequestBlock>> {
    let mut queue: VecDeque<&str> = tokens.iter().map(AsRef::as_ref).collect();
    let mut blocks = Vec::new();

    while let Some(token) = queue.pop_front() {
        let object = schema.resolve_identifier(token)?;

        let mut properties = Vec::new();
        while let Some(token) = queue.pop_front() {
            properties.push(reference::parse(token)?);

            if queue.front().is_some_and(|next| next.contains([':', ','])) {
                break;
            }
        }

        if properties.is_empty() {
            debug!("Dropping {} with no properties", object);
            continue;
        }
        blocks.push(PropertyRequestBlock { object, properties });
    }

    if blocks.is_empty() {
        return Err(GatewayError::EmptyRequest);
    }
    Ok(blocks)
}

/// One object with its properties, already grouped by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRequest<'a> {
    pub object: &'a str,
    pub properties: &'a [String],
}

/// Compile explicitly grouped requests, with the same validation as `compile`
///
/// Skips the punctuation lookahead, so a property token can never be taken
/// for an object identifier.
pub fn compile_grouped(
    schema: &dyn VendorSchema,
    vendor_id: u16,
    groups: &[GroupedRequest<'_>],
) -> GatewayResult<Vec<PropertyRequestBlock>> {
    let blocks = parse_grouped(schema, groups)?;
    check_blocks(schema, vendor_id, &blocks)?;
    Ok(blocks)
}

/// Syntax pass of `compile_grouped`
pub fn parse_grouped(
    schema: &dyn VendorSchema,
    groups: &[GroupedRequest<'_>],
) -> GatewayResult<Vec<PropertyRequestBlock>> {
    let mut blocks = Vec::with_capacity(groups.len());

    for group in groups {
        let object = schema.resolve_identifier(group.object)?;
        let properties = group
            .properties
            .iter()
            .map(|token| reference::parse(token))
            .collect::<GatewayResult<Vec<_>>>()?;

        if !properties.is_empty() {
            blocks.push(PropertyRequestBlock { object, properties });
        }
    }

    if blocks.is_empty() {
        return Err(GatewayError::EmptyRequest);
    }
    Ok(blocks)
}

/// Check parsed blocks against the object classes `vendor_id` defines
pub fn check_blocks(
    schema: &dyn VendorSchema,
    vendor_id: u16,
    blocks: &[PropertyRequestBlock],
) -> GatewayResult<()> {
    for block in blocks {
        let object_type = block.object.object_type;
        let class = schema
            .object_class(vendor_id, object_type)
            .ok_or_else(|| GatewayError::UnrecognizedObjectType(object_type.to_string()))?;

        for property in &block.properties {
            check_property(schema, &class, property)?;
        }
    }
    Ok(())
}

fn check_property(schema: &dyn VendorSchema, class: &ObjectClass, property: &PropertyReference) -> GatewayResult<()> {
    if is_wildcard_property(&property.property_identifier)
        || schema.property_type(class, &property.property_identifier).is_some()
    {
        Ok(())
    } else {
        Err(GatewayError::UnrecognizedProperty {
            object_type: class.object_type.to_string(),
            property: property.property_identifier.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bacnet::schema::StandardSchema;
    use crate::bacnet::types::{ObjectIdentifier, ObjectType};

    fn schema() -> StandardSchema {
        StandardSchema::new()
    }

    #[test]
    fn test_compile_two_blocks() {
        let tokens = ["analog-input,2", "present-value", "units", "analog-value,301", "description"];
        let blocks = compile(&schema(), 0, &tokens).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].object, ObjectIdentifier::new(ObjectType::ANALOG_INPUT, 2));
        assert_eq!(
            blocks[0].properties,
            vec![PropertyReference::new("present-value"), PropertyReference::new("units")]
        );
        assert_eq!(blocks[1].object, ObjectIdentifier::new(ObjectType::ANALOG_VALUE, 301));
        assert_eq!(blocks[1].properties, vec![PropertyReference::new("description")]);
    }

    #[test]
    fn test_compile_accepts_colon_identifiers_and_indexes() {
        let tokens = ["binary-value:4", "priority-array[8]", "all", "device:201201", "object-list[0]"];
        let blocks = compile(&schema(), 0, &tokens).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].properties[0], PropertyReference::indexed("priority-array", 8));
        assert_eq!(blocks[0].properties[1], PropertyReference::new("all"));
        assert_eq!(blocks[1].object.object_type, ObjectType::DEVICE);
    }

    #[test]
    fn test_compile_flattened_pairs() {
        let pairs = [("analog-input,2", "present-value"), ("analog-input,2", "units")];
        let tokens = flatten_pairs(pairs);
        assert_eq!(tokens.len(), 4);

        let blocks = compile(&schema(), 0, tokens.as_slice()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.properties.len() == 1));
    }

    #[test]
    fn test_compile_rejects_unknown_object_type() {
        let schema = schema();
        let tokens = ["warp-core,1", "present-value"];
        assert!(matches!(
            compile(&schema, 0, &tokens),
            Err(GatewayError::UnrecognizedObjectType(t)) if t == "warp-core"
        ));

        let tokens = ["600,1", "present-value"];
        assert!(matches!(
            compile(&schema, 0, &tokens),
            Err(GatewayError::UnrecognizedObjectType(_))
        ));
    }

    #[test]
    fn test_compile_rejects_undeclared_property() {
        let tokens = ["analog-input,2", "present-value", "weekly-schedule"];
        let err = compile(&schema(), 0, &tokens).unwrap_err();
        assert_eq!(
            err,
            GatewayError::UnrecognizedProperty {
                object_type: "analog-input".to_string(),
                property: "weekly-schedule".to_string(),
            }
        );
    }

    #[test]
    fn test_compile_malformed_property() {
        let tokens = ["analog-input,2", "present value"];
        assert!(matches!(
            compile(&schema(), 0, &tokens),
            Err(GatewayError::MalformedPropertyReference(_))
        ));
    }

    #[test]
    fn test_compile_empty_request() {
        let none: [&str; 0] = [];
        assert_eq!(compile(&schema(), 0, &none).unwrap_err(), GatewayError::EmptyRequest);

        let lone_object = ["analog-input,2"];
        assert_eq!(compile(&schema(), 0, &lone_object).unwrap_err(), GatewayError::EmptyRequest);
    }

    #[test]
    fn test_parse_tokens_needs_no_schema_classes() {
        // a proprietary type nobody registered still parses
        let tokens = ["600,1", "present-value", "analog-input,2", "units"];
        let blocks = parse_tokens(&schema(), &tokens).unwrap();
        assert_eq!(blocks.len(), 2);

        assert!(matches!(
            check_blocks(&schema(), 0, &blocks),
            Err(GatewayError::UnrecognizedObjectType(_))
        ));
    }

    #[test]
    fn test_parse_tokens_rejects_bad_syntax() {
        let tokens = ["analog-input,2", "bad value"];
        assert_eq!(
            parse_tokens(&schema(), &tokens).unwrap_err(),
            GatewayError::MalformedPropertyReference("bad value".to_string())
        );

        let tokens = ["analog-input2", "present-value"];
        assert!(parse_tokens(&schema(), &tokens).unwrap_err().is_validation());
    }

    #[test]
    fn test_compile_grouped() {
        let present = vec!["present-value".to_string()];
        let both = vec!["present-value".to_string(), "units".to_string()];
        let groups = [
            GroupedRequest { object: "analog-input,2", properties: &both },
            GroupedRequest { object: "analog-value:301", properties: &present },
        ];
        let blocks = compile_grouped(&schema(), 0, &groups).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].properties.len(), 2);

        let bad = vec!["weekly-schedule".to_string()];
        let groups = [GroupedRequest { object: "analog-input,2", properties: &bad }];
        assert!(matches!(
            compile_grouped(&schema(), 0, &groups),
            Err(GatewayError::UnrecognizedProperty { .. })
        ));
    }
}
