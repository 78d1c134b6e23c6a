//! Round-Trip: Schema-Graph → Texte → Schema-Graph.

mod common;

use common::*;
use xsdinfer::codec::{deserialize, deserialize_all, read_schema_set, serialize, serialize_all};
use xsdinfer::schema::{HEADER_COMMENT, PRIMARY_LOCATION};
use xsdinfer::{infer_all, infer_from_str, write_schema_set, ElementNode, Error, InferOptions, SchemaDocument};

fn infer(xml: &str) -> SchemaDocument {
    infer_from_str(xml, &InferOptions::default()).expect("inference")
}

/// Every reference node of the graph paired with the namespace of the
/// import its prefix position names.
fn check_bindings(doc: &SchemaDocument) {
    fn walk(e: &ElementNode, doc: &SchemaDocument) {
        if let Some(r) = &e.reference {
            let position = doc.import_position(r.namespace.as_deref()).expect("bound import");
            if r.namespace.is_some() {
                assert_eq!(r.prefix, format!("q{}", position + 1));
            }
        }
        for c in e.children() {
            walk(c, doc);
        }
    }
    for global in doc.global_elements() {
        walk(global, doc);
    }
    for import in &doc.imports {
        let sub = import.schema.as_ref().expect("resolved import");
        assert_eq!(sub.target_namespace, import.namespace);
        check_bindings(sub);
    }
}

#[test]
fn every_sample_survives_the_round_trip() {
    let opts = InferOptions::default();
    for (name, xml) in ALL {
        let doc = infer(xml);
        let texts = serialize_all(&doc).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(texts.len(), doc.document_count(), "{name}");

        let back = deserialize_all(&texts, 0, &opts).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(back, doc, "{name}");
        check_bindings(&back);

        // zweiter Durchlauf erzeugt identische Texte
        assert_eq!(serialize_all(&back).unwrap(), texts, "{name}");
    }
}

#[test]
fn texts_follow_pre_order() {
    let texts = serialize_all(&infer(ALTERNATING)).unwrap();
    let targets: Vec<_> = texts
        .iter()
        .map(|t| deserialize(t, &InferOptions::default()).unwrap().target_namespace)
        .collect();
    assert_eq!(
        targets,
        [
            Some("urn:outer".to_string()),
            Some("urn:inner".to_string()),
            Some("urn:outer".to_string()),
            Some("urn:third".to_string()),
        ]
    );
}

#[test]
fn soap_texts() {
    let texts = serialize_all(&infer(SOAP_RESPONSE)).unwrap();
    assert_eq!(texts.len(), 2);
    for t in &texts {
        assert!(t.contains(HEADER_COMMENT));
        assert!(t.contains(r#"attributeFormDefault="unqualified" elementFormDefault="qualified""#));
    }
    assert!(texts[0].contains(&format!(
        r#"<xs:import schemaLocation="1.xsd" namespace="{SERVICE_NS}"/>"#
    )));
    assert!(texts[0].contains(&format!(
        r#"<xs:element xmlns:q1="{SERVICE_NS}" ref="q1:CheckAuthorizedUserResponse" minOccurs="0"/>"#
    )));
    assert!(texts[1].contains(&format!(r#"targetNamespace="{SERVICE_NS}""#)));
}

#[test]
fn start_index_skips_leading_entries() {
    let mut texts = vec![serialize(&infer(SIMPLE_LETTER)).unwrap()];
    texts.extend(serialize_all(&infer(SOAP_RESPONSE)).unwrap());

    let back = deserialize_all(&texts, 1, &InferOptions::default()).unwrap();
    assert_eq!(back, infer(SOAP_RESPONSE));
}

#[test]
fn short_list_never_truncates() {
    let texts = serialize_all(&infer(ALTERNATING)).unwrap();
    for len in 1..texts.len() {
        let err = deserialize_all(&texts[..len], 0, &InferOptions::default()).unwrap_err();
        assert_eq!(err, Error::DeserializationIndexOutOfRange { index: len, len });
    }
}

#[test]
fn start_past_end() {
    let texts: Vec<String> = Vec::new();
    assert_eq!(
        deserialize_all(&texts, 0, &InferOptions::default()).unwrap_err(),
        Error::DeserializationIndexOutOfRange { index: 0, len: 0 }
    );
}

#[test]
fn swapped_texts_are_detected() {
    let mut texts = serialize_all(&infer(ALTERNATING)).unwrap();
    texts.swap(1, 3);
    assert!(deserialize_all(&texts, 0, &InferOptions::default()).is_err());
}

#[test]
fn merged_graph_round_trips() {
    let a = r#"<r><x xmlns="urn:a"><y xmlns="urn:b"/></x></r>"#;
    let b = r#"<r><z xmlns="urn:b"/><x xmlns="urn:a"><w xmlns="urn:c"/></x></r>"#;
    let merged = infer_all([a, b], &InferOptions::default()).unwrap().unwrap();
    check_bindings(&merged);

    let texts = serialize_all(&merged).unwrap();
    let back = deserialize_all(&texts, 0, &InferOptions::default()).unwrap();
    assert_eq!(back, merged);
}

#[test]
fn every_referenced_element_is_declared() {
    let doc = infer(r#"<r xmlns:a="urn:a"><a:x/><a:y/></r>"#);
    let texts = serialize_all(&doc).unwrap();
    assert!(texts[0].contains(r#"<xs:element xmlns:q1="urn:a" ref="q1:x" minOccurs="0"/>"#));
    assert!(texts[0].contains(r#"<xs:element xmlns:q1="urn:a" ref="q1:y" minOccurs="0"/>"#));
    assert!(texts[1].contains(r#"<xs:element name="x"/><xs:element name="y"/></xs:schema>"#));

    let back = deserialize_all(&texts, 0, &InferOptions::default()).unwrap();
    assert_eq!(back, doc);
    check_bindings(&back);
}

#[test]
fn namespace_with_line_break_round_trips() {
    let doc = infer("<r xmlns:a=\"urn:a\nb\"><a:x/></r>");
    assert_eq!(doc.imports[0].namespace.as_deref(), Some("urn:a\nb"));

    let texts = serialize_all(&doc).unwrap();
    let back = deserialize_all(&texts, 0, &InferOptions::default()).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn schema_set_on_disk() {
    let doc = infer(ALTERNATING);
    let dir = tempfile::tempdir().unwrap();
    let primary = write_schema_set(&doc, dir.path()).unwrap();
    assert!(primary.ends_with(PRIMARY_LOCATION));
    for location in ["0.xsd", "1.xsd", "2.xsd", "3.xsd"] {
        assert!(dir.path().join(location).is_file(), "{location}");
    }

    let back = read_schema_set(dir.path(), PRIMARY_LOCATION, &InferOptions::default()).unwrap();
    assert_eq!(back, doc);
}
