//! Namespace handling end to end: prefix registration, document scans,
//! namespaced element creation, declarations and attribute qualified names.
//!
//! The expected documents are compared byte for byte with the serializer's
//! output.

#![allow(clippy::unwrap_used)]

use xmlpath::{split_qname, Error, XmlDocument};

const HTML: &str = "http://www.w3.org/TR/html4/";
const CPACS: &str = "http://www.dlr.de/cpacs";
const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

const MIXED: &str = r#"<?xml version="1.0"?>
<root>
  <h:table xmlns:h="http://www.w3.org/TR/html4/">
    <h:tr>
      <h:td>Apples</h:td>
      <h:td>Bananas</h:td>
    </h:tr>
  </h:table>
  <aircraft xmlns="http://www.dlr.de/cpacs">
    <modelname>D150</modelname>
  </aircraft>
</root>
"#;

fn mixed() -> XmlDocument {
    XmlDocument::parse_str(MIXED).unwrap()
}

// --- Qualified names ---

#[test]
fn test_split_qualified_names() {
    assert_eq!(split_qname("html:td"), (Some("html"), "td"));
    assert_eq!(split_qname("mynewtag"), (None, "mynewtag"));
    assert_eq!(split_qname(":td"), (None, ":td"));
    assert_eq!(split_qname("a:b:c"), (None, "a:b:c"));
}

// --- Registration ---

#[test]
fn test_registered_prefix_finds_element() {
    let mut doc = mixed();
    assert!(matches!(
        doc.check_element("/root/html:table"),
        Err(Error::InvalidXPath { .. })
    ));

    doc.register_namespace(HTML, "html").unwrap();
    doc.check_element("/root/html:table/").unwrap();
    assert_eq!(doc.text("/root/html:table/html:tr/html:td[1]").unwrap(), "Apples");

    doc.register_namespace(CPACS, "c").unwrap();
    assert_eq!(doc.text("/root/c:aircraft/c:modelname").unwrap(), "D150");
    // Unprefixed steps only match elements without a namespace.
    assert!(matches!(
        doc.check_element("/root/aircraft"),
        Err(Error::ElementNotFound(_))
    ));
}

#[test]
fn test_register_rejects_empty_uri() {
    let mut doc = mixed();
    assert!(matches!(
        doc.register_namespace("", "h"),
        Err(Error::InvalidNamespaceUri)
    ));
    assert!(doc.namespaces().is_empty());
}

#[test]
fn test_reregistering_prefix_remaps_queries() {
    let mut doc = mixed();
    doc.register_namespace(HTML, "x").unwrap();
    assert_eq!(doc.count_matches("//x:td").unwrap(), 2);

    doc.register_namespace(CPACS, "x").unwrap();
    assert_eq!(doc.count_matches("//x:td").unwrap(), 0);
    assert_eq!(doc.count_matches("//x:modelname").unwrap(), 1);
}

#[test]
fn test_register_from_document() {
    let mut doc = mixed();
    assert_eq!(doc.register_namespaces_from_document(), 1);

    doc.check_element("/root/h:table/h:tr/").unwrap();
    assert!(matches!(
        doc.check_element("/root/html:table"),
        Err(Error::InvalidXPath { .. })
    ));
    // The default namespace has no prefix to register.
    assert!(matches!(
        doc.check_element("/root/aircraft"),
        Err(Error::ElementNotFound(_))
    ));
    assert!(matches!(
        doc.check_element("/root/cpacs:aircraft"),
        Err(Error::InvalidXPath { .. })
    ));
}

#[test]
fn test_register_from_document_later_declaration_wins() {
    let mut doc = XmlDocument::parse_str(
        r#"<r><a xmlns:p="urn:first"><p:x/></a><b xmlns:p="urn:second"><p:y/></b></r>"#,
    )
    .unwrap();
    doc.register_namespaces_from_document();
    assert_eq!(doc.namespaces().resolve("p"), Some("urn:second"));
    assert_eq!(doc.count_matches("//p:x").unwrap(), 0);
    assert_eq!(doc.count_matches("//p:y").unwrap(), 1);
}

// --- Children by qualified name ---

#[test]
fn test_named_children_count() {
    let mut doc = mixed();
    doc.register_namespace(HTML, "html").unwrap();
    let tr = "/root/html:table/html:tr";
    assert_eq!(doc.named_children_count(tr, "html:td").unwrap(), 2);
    assert_eq!(doc.named_children_count(tr, "td").unwrap(), 0);
    assert_eq!(doc.child_name(tr, 1).unwrap(), "h:td");
    assert!(matches!(
        doc.named_children_count(tr, "g:td"),
        Err(Error::InvalidNamespacePrefix(_))
    ));
}

#[test]
fn test_match_paths_use_document_prefixes() {
    let mut doc = mixed();
    doc.register_namespace(HTML, "html").unwrap();
    doc.register_namespace(CPACS, "c").unwrap();
    assert_eq!(
        doc.match_path("//html:td", 2).unwrap(),
        "/root/h:table/h:tr/h:td[2]"
    );
    assert_eq!(doc.match_path("//c:modelname", 1).unwrap(), "/root/*[2]/*");
    assert_eq!(doc.element_namespace("/root/c:aircraft").unwrap().as_deref(), Some(CPACS));
}

// --- Building documents ---

#[test]
fn test_build_reference_document() {
    let mut doc = XmlDocument::create("root").unwrap();
    doc.create_element_ns("/root", "h:table", HTML).unwrap();
    doc.register_namespace(HTML, "h").unwrap();
    doc.create_element_ns("/root/h:table", "tr", HTML).unwrap();
    doc.add_text_element_ns("/root/h:table/h:tr", "td", HTML, "Apples")
        .unwrap();
    doc.add_text_element_ns("/root/h:table/h:tr", "td", HTML, "Bananas")
        .unwrap();
    doc.create_element_ns("/root", "aircraft", CPACS).unwrap();
    doc.register_namespace(CPACS, "c").unwrap();
    doc.add_text_element_ns("/root/c:aircraft", "modelname", CPACS, "D150")
        .unwrap();

    assert_eq!(doc.to_xml_string(), MIXED);
}

#[test]
fn test_set_root_namespace() {
    let mut doc = XmlDocument::create("root").unwrap();
    doc.set_pretty_print(false);
    doc.set_element_namespace("/root", CPACS, Some("cpacs"))
        .unwrap();
    assert_eq!(
        doc.to_xml_string(),
        "<?xml version=\"1.0\"?>\n<cpacs:root xmlns:cpacs=\"http://www.dlr.de/cpacs\"/>\n"
    );
    doc.register_namespace(CPACS, "c").unwrap();
    doc.check_element("/c:root").unwrap();
}

#[test]
fn test_declaration_does_not_move_element() {
    let mut doc = XmlDocument::create("root").unwrap();
    doc.set_pretty_print(false);
    doc.declare_namespace("/root", CPACS, "cpacs").unwrap();
    assert_eq!(
        doc.to_xml_string(),
        "<?xml version=\"1.0\"?>\n<root xmlns:cpacs=\"http://www.dlr.de/cpacs\"/>\n"
    );

    doc.register_namespace(CPACS, "c").unwrap();
    doc.check_element("/root").unwrap();
    assert!(matches!(
        doc.check_element("/c:root"),
        Err(Error::ElementNotFound(_))
    ));

    assert!(matches!(
        doc.declare_namespace("/root", CPACS, ""),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        doc.declare_namespace("/root", "", "x"),
        Err(Error::InvalidNamespaceUri)
    ));
}

#[test]
fn test_schema_location_attribute() {
    let mut doc = XmlDocument::create("cpacs").unwrap();
    doc.declare_namespace("/cpacs", XSI, "xsi").unwrap();
    doc.register_namespace(XSI, "xsi").unwrap();
    doc.set_attribute("/cpacs", "xsi:noNamespaceSchemaLocation", "cpacs_schema.xsd")
        .unwrap();
    doc.create_element("/cpacs", "header").unwrap();

    assert_eq!(
        doc.to_xml_string(),
        "<?xml version=\"1.0\"?>\n\
         <cpacs xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:noNamespaceSchemaLocation=\"cpacs_schema.xsd\">\n  <header/>\n</cpacs>\n"
    );
}

#[test]
fn test_text_elements_reuse_and_declare_prefixes() {
    let mut doc = XmlDocument::create("root").unwrap();
    doc.set_pretty_print(false);
    doc.add_text_element_ns("/root", "svg:image", "urn:svg", "").unwrap();
    doc.register_namespace("urn:svg", "svg").unwrap();
    doc.add_text_element_ns("/root/svg:image", "circle", "urn:svg", "r=1")
        .unwrap();
    doc.add_text_element_ns("/root/svg:image", "svg:cone", "urn:svg", "")
        .unwrap();
    doc.add_text_element_ns("/root/svg:image", "pref:cube", "urn:svg", "")
        .unwrap();
    doc.check_element("/root/svg:image/svg:cube").unwrap();

    doc.add_text_element_ns("/root", "mesh", "urn:collada", "").unwrap();
    doc.register_namespace("urn:collada", "collada").unwrap();
    doc.add_text_element_ns("/root/collada:mesh", "points", "urn:collada", "0 0 0")
        .unwrap();

    assert!(matches!(
        doc.add_text_element_ns("/root", "svg:size", "", "10"),
        Err(Error::InvalidNamespaceUri)
    ));

    assert_eq!(
        doc.to_xml_string(),
        "<?xml version=\"1.0\"?>\n<root>\
         <svg:image xmlns:svg=\"urn:svg\"><svg:circle>r=1</svg:circle><svg:cone/>\
         <pref:cube xmlns:pref=\"urn:svg\"/></svg:image>\
         <mesh xmlns=\"urn:collada\"><points>0 0 0</points></mesh></root>\n"
    );
}

#[test]
fn test_new_default_namespace_survives_reload() {
    let mut doc = XmlDocument::parse_str("<r><a/></r>").unwrap();
    doc.set_element_namespace("/r", "urn:q", None).unwrap();
    doc.register_namespace("urn:q", "q").unwrap();
    assert_eq!(doc.count_matches("/q:r/a").unwrap(), 1);

    let mut reloaded = XmlDocument::parse_str(&doc.to_xml_string()).unwrap();
    reloaded.register_namespace("urn:q", "q").unwrap();
    assert_eq!(reloaded.count_matches("/q:r/a").unwrap(), 1);
    assert_eq!(reloaded.count_matches("/q:r/q:a").unwrap(), 0);
}

#[test]
fn test_reserved_prefixes_are_not_declared() {
    let mut doc = XmlDocument::create("root").unwrap();
    assert!(matches!(
        doc.create_element_ns("/root", "xmlns:foo", "urn:x"),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        doc.create_element_ns("/root", "xml:bar", "urn:y"),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(doc.child_count("/root").unwrap(), 0);

    // Documents that make those bindings do not load either.
    assert!(matches!(
        XmlDocument::parse_str(r#"<xmlns:foo xmlns:xmlns="urn:x"/>"#),
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        XmlDocument::parse_str(r#"<xml:bar xmlns:xml="urn:y"/>"#),
        Err(Error::Parse(_))
    ));
}

// --- Attributes by qualified name ---

#[test]
fn test_attributes_with_namespaces() {
    let mut doc = mixed();
    doc.register_namespace(HTML, "h").unwrap();
    let tr = "/root/h:table/h:tr";

    doc.set_attribute(tr, "h:width", "6").unwrap();
    doc.set_attribute(tr, "size", "2").unwrap();
    assert!(matches!(
        doc.set_attribute(tr, "g:length", "0"),
        Err(Error::InvalidNamespacePrefix(p)) if p == "g"
    ));

    assert_eq!(doc.attribute(tr, "h:width").unwrap(), "6");
    assert!(matches!(
        doc.attribute(tr, "g:width"),
        Err(Error::InvalidNamespacePrefix(_))
    ));
    assert!(matches!(
        doc.attribute(tr, "width"),
        Err(Error::AttributeNotFound { .. })
    ));

    assert_eq!(doc.attribute_count(tr).unwrap(), 2);
    assert_eq!(doc.attribute_name(tr, 1).unwrap(), "h:width");
    assert_eq!(doc.attribute_name(tr, 2).unwrap(), "size");
    assert!(matches!(
        doc.attribute_name(tr, 3),
        Err(Error::IndexOutOfRange { index: 3, count: 2 })
    ));

    doc.check_attribute(tr, "h:width").unwrap();
    assert!(matches!(
        doc.check_attribute(tr, "g:width"),
        Err(Error::AttributeNotFound { .. })
    ));
    assert!(matches!(
        doc.check_attribute(tr, "h:size"),
        Err(Error::AttributeNotFound { .. })
    ));

    doc.remove_attribute(tr, "size").unwrap();
    assert_eq!(doc.attribute_count(tr).unwrap(), 1);
    assert!(matches!(
        doc.remove_attribute(tr, "g:size"),
        Err(Error::InvalidNamespacePrefix(_))
    ));
    assert!(matches!(
        doc.remove_attribute(tr, "h:size"),
        Err(Error::AttributeNotFound { .. })
    ));
    doc.remove_attribute(tr, "h:width").unwrap();
    assert_eq!(doc.attribute_count(tr).unwrap(), 0);
}

#[test]
fn test_attribute_axis_matches_by_uri() {
    let mut doc = XmlDocument::parse_str(
        r#"<r xmlns:a="urn:a"><e a:id="1" id="2"/><e xmlns:b="urn:a" b:id="3"/></r>"#,
    )
    .unwrap();
    doc.register_namespace("urn:a", "n").unwrap();
    assert_eq!(doc.count_matches("//@n:id").unwrap(), 2);
    assert_eq!(doc.count_matches("//@id").unwrap(), 1);
    assert_eq!(doc.match_text("//@n:id", 2).unwrap(), "3");
    assert_eq!(doc.match_name("//@n:id", 2).unwrap(), "b:id");
    // Declarations are not attributes.
    assert_eq!(doc.count_matches("//@*").unwrap(), 3);
}

#[test]
fn test_xml_prefix_is_always_bound() {
    let doc = XmlDocument::parse_str(r#"<r xml:lang="en"><p/></r>"#).unwrap();
    assert_eq!(doc.attribute("/r", "xml:lang").unwrap(), "en");
    assert_eq!(doc.count_matches("//p[lang('en')]").unwrap(), 1);
    assert_eq!(doc.count_matches("/r/@xml:lang").unwrap(), 1);
}
