//! Subcommand implementations. Each returns the text printed on stdout.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context as _, anyhow};
use fbmap_typemap::{
    Attachment, NameMap, Record, Schema, SchemaRef, SortBy, Value, column_list,
    column_list_from_str, extract, extract_all, parse_document, to_wire_args,
};

fn lookup(name: &str) -> anyhow::Result<SchemaRef> {
    fbmap_objects::schema(name).ok_or_else(|| anyhow!("unknown schema {name:?}, see `fbmap schemas`"))
}

/// Extracts records from `xml` and renders them as pretty JSON.
pub fn extract_records(
    schema: &str,
    xml: &str,
    container: Option<&str>,
    sort: &[String],
    name_map: &NameMap,
) -> anyhow::Result<String> {
    let schema = lookup(schema)?;
    let doc = parse_document(xml)?;
    let root = doc.root_element();

    let records = match container {
        Some(tag) => {
            let node = root
                .descendants()
                .find(|n| n.has_tag_name(tag))
                .ok_or_else(|| anyhow!("no <{tag}> element in the response"))?;
            extract_all(node.children(), &schema, name_map, SortBy::from(sort.to_vec()))?
        }
        None => vec![extract(&root, &schema, name_map)?],
    };
    tracing::info!(records = records.len(), "extracted");
    Ok(serde_json::to_string_pretty(&records)?)
}

/// The `cols` argument for a schema, optionally restricted to `subset`.
pub fn columns(schema: &str, subset: Option<&str>, name_map: &NameMap) -> anyhow::Result<String> {
    let schema = lookup(schema)?;
    let cols = match subset {
        Some(subset) => column_list_from_str(&schema, name_map, subset)?,
        None => column_list::<&str>(&schema, name_map, None)?,
    };
    Ok(cols)
}

/// Builds request arguments from a JSON record.
///
/// Attachment fields take an object of attachment name to file path. The
/// output lists plain arguments under `fields` and attachment names under
/// `files`.
pub fn wire_args(schema: &str, json: &str, name_map: &NameMap) -> anyhow::Result<String> {
    let schema = lookup(schema)?;
    let json: serde_json::Value = serde_json::from_str(json).context("record is not valid JSON")?;
    let record = Record::from_json(&json).ok_or_else(|| anyhow!("record must be a JSON object"))?;
    let record = attach_paths(record, &schema)?;

    let args = to_wire_args(&record, &schema, name_map)?;
    let output = serde_json::json!({
        "fields": args.fields,
        "files": args.files.keys().collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn attach_paths(record: Record, schema: &Schema) -> anyhow::Result<Record> {
    record
        .into_iter()
        .map(|(name, value)| -> anyhow::Result<(String, Value)> {
            let is_attachments = schema.get(&name).is_some_and(|f| f.is_attachments());
            let value = match value {
                Value::Record(files) if is_attachments => {
                    let mut attachments = BTreeMap::new();
                    for (file, path) in files {
                        let path = path
                            .as_str()
                            .ok_or_else(|| anyhow!("attachment {file:?} must be a file path"))?;
                        attachments.insert(file, Attachment::Path(PathBuf::from(path)));
                    }
                    Value::Attachments(attachments)
                }
                other => other,
            };
            Ok((name, value))
        })
        .collect()
}

/// One line per catalogue schema: its name and `field:kind` pairs.
pub fn list_schemas() -> String {
    let registry = fbmap_objects::registry();
    let mut out = String::new();
    for (name, schema) in registry.iter() {
        let fields: Vec<String> = schema
            .iter()
            .map(|(field, descriptor)| format!("{field}:{}", descriptor.kind()))
            .collect();
        out.push_str(name);
        out.push('\t');
        out.push_str(&fields.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const AREAS: &str = r#"<response><areas>
        <area><ixArea>5</ixArea><sArea>UI</sArea><ixProject>2</ixProject><sProject>Web</sProject>
          <ixPersonOwner>1</ixPersonOwner><sPersonOwner>Ann</sPersonOwner><nType>0</nType><cDoc>0</cDoc></area>
        <area><ixArea>1</ixArea><sArea>Misc</sArea><ixProject>1</ixProject><sProject>Core</sProject>
          <ixPersonOwner>1</ixPersonOwner><sPersonOwner>Ann</sPersonOwner><nType>0</nType><cDoc>3</cDoc></area>
    </areas></response>"#;

    #[test]
    fn test_extract_records_sorted() {
        let json = extract_records(
            "fbArea",
            AREAS,
            Some("areas"),
            &["ixProject".to_string()],
            &NameMap::new(),
        )
        .unwrap();
        let records: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(records[0]["sArea"], "Misc");
        assert_eq!(records[1]["ixArea"], 5);
    }

    #[test]
    fn test_extract_root_record() {
        let xml = r#"<error code="3">Not logged on</error>"#;
        let json = extract_records("fbError", xml, None, &[], &NameMap::new()).unwrap();
        let records: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(records[0]["code"], 3);
        assert_eq!(records[0]["sError"], "Not logged on");
    }

    #[test]
    fn test_extract_unknown_schema_and_container() {
        assert!(extract_records("fbNope", AREAS, None, &[], &NameMap::new()).is_err());
        assert!(extract_records("fbArea", AREAS, Some("cases"), &[], &NameMap::new()).is_err());
    }

    #[test]
    fn test_columns() {
        assert_eq!(
            columns("fbTag", None, &NameMap::new()).unwrap(),
            "cTagUses,ixTag,sTag"
        );
        assert_eq!(
            columns("fbBug", Some("sTitle ixBug"), &NameMap::new()).unwrap(),
            "sTitle,ixBug"
        );
        assert!(columns("fbBug", Some("sNope"), &NameMap::new()).is_err());
    }

    #[test]
    fn test_wire_args_with_attachment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "stack trace").unwrap();
        let record = serde_json::json!({
            "ixBug": 4,
            "sTitle": "Crash",
            "Files": { "File1": file.path() },
        });

        let out = wire_args("fbBug_edit", &record.to_string(), &NameMap::new()).unwrap();
        let out: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["fields"]["ixBug"], "4");
        assert_eq!(out["fields"]["sTitle"], "Crash");
        assert_eq!(out["files"][0], "File1");
    }

    #[test]
    fn test_wire_args_fix_for_set_names() {
        let out = wire_args(
            "fbMilestone",
            r#"{"ixFixFor": 2, "dt": "2012-05-06T07:08:09Z", "fDeleted": false}"#,
            &NameMap::new(),
        )
        .unwrap();
        let out: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(out["fields"]["dtRelease"], "2012-05-06T07:08:09Z");
        assert_eq!(out["fields"]["fAssignable"], "false");
    }

    #[test]
    fn test_wire_args_rejects_non_objects() {
        assert!(wire_args("fbBug", "[1, 2]", &NameMap::new()).is_err());
        assert!(wire_args("fbBug", "{", &NameMap::new()).is_err());
    }

    #[test]
    fn test_list_schemas() {
        let listing = list_schemas();
        assert!(listing.lines().any(|l| l.starts_with("fbMilestone\t")));
        assert!(listing.contains("ixBugChildren:fbcommalistof"));
    }
}
