use std::path::Path;

use super::*;
use crate::model::Document;

fn document(id: &str, source: &str) -> Document {
    DocumentLoader::new(Path::new("."))
        .expect("loader")
        .parse_document(id, Path::new(id), source.to_string())
        .expect("document parses")
}

fn fixture() -> (Vec<Document>, Vec<FailedSource>) {
    let body = (0..20)
        .map(|index| format!("w{index}"))
        .collect::<Vec<String>>()
        .join(" ");
    let docs = vec![
        document("a.md", &format!("# Introduction\n\n{body}\n")),
        document("b.md", &format!("# Introduction\n\n{body} extra\n")),
        document("c.md", "# Summary\n\nshort\n"),
    ];
    let failures = vec![FailedSource {
        file: "d.md".to_string(),
        line: Some(4),
        reason: "unterminated code fence ```".to_string(),
    }];
    (docs, failures)
}

#[test]
fn text_output_lists_groups_members_and_failures() {
    let (docs, failures) = fixture();
    let outcome = deduplicate(&docs, &SimilarityConfig::default());

    let mut output = Vec::new();
    write_text_response(&mut output, &outcome, &failures).expect("write text");

    assert_eq!(
        String::from_utf8(output).expect("utf8"),
        "Groups: 1 discarded=1\n\
         introduction\tcanonical=b.md#0\tline 1\n\
         \t- a.md#0\tsimilarity=0.952\n\
         \t* b.md#0\tsimilarity=1.000\n\
         FAILED d.md:4 unterminated code fence ```\n"
    );
}

#[test]
fn json_output_carries_settings_groups_and_failures() {
    let (docs, failures) = fixture();
    let config = SimilarityConfig::default();
    let outcome = deduplicate(&docs, &config);
    let response = DuplicatesResponse {
        threshold: config.threshold,
        metric: config.metric.as_str(),
        documents: docs.len(),
        groups: &outcome.groups,
        discarded: &outcome.discarded,
        failures: &failures,
    };

    let mut output = Vec::new();
    write_json_response(&mut output, &response).expect("write json");
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.ends_with("}\n"));

    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(json["metric"], "jaccard");
    assert_eq!(json["documents"], 3);
    assert_eq!(json["groups"][0]["key"], "introduction");
    assert_eq!(json["groups"][0]["canonical_id"]["document"], "b.md");
    assert_eq!(json["groups"][0]["members"].as_array().expect("members").len(), 2);
    assert!(json["groups"][0].get("canonical").is_none());
    assert_eq!(json["discarded"][0]["section"]["document"], "a.md");
    assert_eq!(json["failures"][0]["line"], 4);
}
