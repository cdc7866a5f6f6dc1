//! The per-document expression cache: repeated queries are served from the
//! cache, and every mutation or registration makes later queries see the
//! current tree.

#![allow(clippy::unwrap_used)]

use std::rc::Rc;

use rstest::rstest;
use xmlpath::xpath::{CacheStats, XPathValue};
use xmlpath::{Error, XmlDocument};

const HTML: &str = "http://www.w3.org/TR/html4/";

const TABLE: &str = r#"<root id="r"><h:table xmlns:h="http://www.w3.org/TR/html4/"><h:tr><h:td>Apples</h:td><h:td>Bananas</h:td></h:tr></h:table></root>"#;

fn table() -> XmlDocument {
    XmlDocument::parse_str(TABLE).unwrap()
}

#[rstest]
#[case("count(//*)")]
#[case("/root/*/*/*[2]")]
#[case("string(//*[last()])")]
#[case("//text()")]
fn test_repeat_is_a_hit(#[case] expression: &str) {
    let doc = table();
    let first = doc.evaluate(expression).unwrap();
    let second = doc.evaluate(expression).unwrap();
    assert_eq!(first, second);
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(
        doc.cache_stats(),
        CacheStats {
            hits: 1,
            misses: 1,
            entries: 1
        }
    );
}

#[test]
fn test_keys_are_exact_text() {
    let doc = table();
    doc.evaluate("count(//*)").unwrap();
    doc.evaluate("count( //* )").unwrap();
    let stats = doc.cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.entries, 2);
}

#[rstest]
#[case::create(|doc: &mut XmlDocument| { doc.create_element("/root", "td").map(|_| ()) })]
#[case::text(|doc: &mut XmlDocument| doc.update_text("/root", ""))]
#[case::attribute(|doc: &mut XmlDocument| doc.set_attribute("/root", "td", "1"))]
#[case::declaration(|doc: &mut XmlDocument| doc.declare_namespace("/root", "urn:x", "x"))]
#[case::rename(|doc: &mut XmlDocument| doc.rename_element("/root", "td"))]
#[case::remove_attribute(|doc: &mut XmlDocument| doc.remove_attribute("/root", "id"))]
#[case::attribute_text(|doc: &mut XmlDocument| doc.update_text("/root/@id", "s"))]
#[case::element_namespace(|doc: &mut XmlDocument| doc.set_element_namespace("/root", "urn:x", None))]
#[case::create_ns(|doc: &mut XmlDocument| {
    doc.add_text_element_ns("/root", "td", "urn:x", "1").map(|_| ())
})]
#[case::remove(|doc: &mut XmlDocument| doc.remove_element("/root/*"))]
fn test_mutation_invalidates(#[case] mutation: fn(&mut XmlDocument) -> xmlpath::Result<()>) {
    let mut doc = table();
    let before = doc.evaluate("count(//td) + count(//@td)").unwrap();
    mutation(&mut doc).unwrap();
    assert_eq!(doc.cache_stats().entries, 0);

    let after = doc.evaluate("count(//td) + count(//@td)").unwrap();
    assert!(!Rc::ptr_eq(&before, &after));
}

#[test]
fn test_query_after_mutation_sees_new_tree() {
    let mut doc = table();
    doc.register_namespace(HTML, "h").unwrap();
    assert_eq!(doc.count_matches("//h:td").unwrap(), 2);
    assert_eq!(doc.match_text("//h:td", 2).unwrap(), "Bananas");

    doc.add_text_element_ns_at("/root/h:table/h:tr", "td", HTML, "Cherries", 1)
        .unwrap();
    assert_eq!(doc.count_matches("//h:td").unwrap(), 3);
    assert_eq!(doc.match_text("//h:td", 2).unwrap(), "Apples");

    doc.remove_element("/root/h:table/h:tr/h:td[1]").unwrap();
    assert_eq!(doc.match_text("//h:td", 1).unwrap(), "Apples");
}

#[test]
fn test_unregistered_prefix_is_never_cached() {
    let mut doc = table();
    let err = doc.evaluate("/root/h:table/h:tr/h:td[1]").unwrap_err();
    assert!(matches!(err, Error::InvalidXPath { .. }));
    assert_eq!(doc.cache_stats(), CacheStats::default());

    doc.register_namespace(HTML, "h").unwrap();
    let value = doc.evaluate("/root/h:table/h:tr/h:td[1]").unwrap();
    assert_eq!(value.as_node_set().map(<[_]>::len), Some(1));
    assert_eq!(doc.text("/root/h:table/h:tr/h:td[1]").unwrap(), "Apples");
    assert_eq!(doc.cache_stats().hits, 1);
}

#[test]
fn test_syntax_error_is_not_cached() {
    let doc = table();
    assert!(doc.evaluate("/root[").is_err());
    assert!(doc.evaluate("/root[").is_err());
    assert_eq!(doc.cache_stats().entries, 0);
}

#[test]
fn test_registration_invalidates() {
    let mut doc = table();
    doc.register_namespace(HTML, "p").unwrap();
    assert_eq!(doc.count_matches("//p:td").unwrap(), 2);

    doc.register_namespace("urn:elsewhere", "p").unwrap();
    assert_eq!(doc.cache_stats().entries, 0);
    assert_eq!(doc.count_matches("//p:td").unwrap(), 0);
}

#[test]
fn test_failed_mutation_keeps_results_correct() {
    let mut doc = table();
    doc.register_namespace(HTML, "h").unwrap();
    assert_eq!(doc.count_matches("//h:td").unwrap(), 2);
    assert!(doc.create_element_ns("/root", "td", "").is_err());
    assert_eq!(doc.count_matches("//h:td").unwrap(), 2);
}

#[test]
fn test_scalar_results_are_cached() {
    let doc = table();
    assert_eq!(
        *doc.evaluate("concat(//*[1], '!')").unwrap(),
        XPathValue::String("ApplesBananas!".to_string())
    );
    doc.evaluate("concat(//*[1], '!')").unwrap();
    assert_eq!(doc.cache_stats().hits, 1);
}
