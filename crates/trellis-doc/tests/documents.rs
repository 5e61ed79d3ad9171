use anyhow::Result;
use serde_json::json;
use trellis_doc::{
    BreakpointTable, ConvertError, HtmlOptions, IdStrategy, NodeKind, PageLookup, Site,
    document_from_json, document_to_html, document_to_json, html_to_document_with, json_to_html,
    schema::validate_tree,
};

fn sequential() -> HtmlOptions {
    HtmlOptions {
        id_strategy: IdStrategy::Sequential,
        ..HtmlOptions::default()
    }
}

#[test]
fn converted_trees_survive_json_storage() -> Result<()> {
    let result = html_to_document_with(
        r#"<main class="max-w-[960px] mx-auto"><h1>Hi</h1><img src="a.png" width="64"><x-map lat="1"></x-map></main>"#,
        &sequential(),
    )?;
    validate_tree(&result.root)?;

    let stored = document_to_json(&result.root, true)?;
    let loaded = document_from_json(&stored)?;
    assert_eq!(loaded, result.root);
    assert_eq!(
        json_to_html(&stored, &BreakpointTable::default())?,
        document_to_html(&result.root)?
    );
    Ok(())
}

#[test]
fn foreign_trees_with_unknown_kinds_fail_loudly() {
    let stored = json!({
        "id": "root",
        "kind": "Root",
        "children": [ { "id": "x", "kind": "Carousel" } ]
    });
    let err = json_to_html(&stored.to_string(), &BreakpointTable::default()).unwrap_err();
    assert!(matches!(err, ConvertError::SerializationFailure(_)), "{err}");
}

#[test]
fn foreign_trees_with_bad_shapes_fail_loudly() {
    let nested_root = json!({
        "id": "a",
        "kind": "Container",
        "children": [ { "id": "b", "kind": "Root" } ]
    });
    assert!(document_from_json(&nested_root.to_string()).is_err());

    let leaf_with_children = json!({
        "id": "a",
        "kind": "Image",
        "props": { "src": "a.png" },
        "children": [ { "id": "b", "kind": "Divider" } ]
    });
    assert!(document_from_json(&leaf_with_children.to_string()).is_err());

    let unexpected_prop = json!({ "id": "a", "kind": "Divider", "props": { "href": "/x" } });
    assert!(document_from_json(&unexpected_prop.to_string()).is_err());

    let opaque_without_markup = json!({ "id": "a", "kind": "OpaqueHTML" });
    assert!(document_from_json(&opaque_without_markup.to_string()).is_err());
}

#[test]
fn site_pages_render_by_path() -> Result<()> {
    let options = sequential();
    let home = html_to_document_with("<h1>Home</h1>", &options)?.root;
    let about = html_to_document_with("<h1>About us</h1><p>Team</p>", &options)?.root;
    assert_eq!(about.children[0].kind, NodeKind::Text);

    let site = Site::from_documents(
        BreakpointTable::default(),
        [("/index.html", home), ("/about/", about)],
    );
    let paths: Vec<&str> = site.paths().collect();
    assert_eq!(paths, vec!["/", "/about"]);

    match site.page_body("/")? {
        PageLookup::Found(html) => assert!(html.contains("<h1>Home</h1>")),
        PageLookup::NotFound => panic!("home page should exist"),
    }
    match site.page_body("/about.html?utm=x")? {
        PageLookup::Found(html) => assert!(html.contains("<p>Team</p>")),
        PageLookup::NotFound => panic!("about page should exist"),
    }
    assert_eq!(site.page_body("/pricing")?, PageLookup::NotFound);
    Ok(())
}
