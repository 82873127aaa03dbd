//! Renders the fixture templates against events decoded from the webhook
//! sample.

use chainpretty_core::{Chain, Event, InMemoryAddressBook, RenderError};
use chainpretty_evm::EventDecoder;
use chainpretty_registry::EventRegistry;
use chainpretty_render::{init_environment, ChainDirectory, EnvGlobals, Renderer, TemplateRenderer};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};

fn fixture_path(rel: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures");
    p.push(rel);
    p
}

fn globals() -> EnvGlobals {
    let book = InMemoryAddressBook::from_file(&fixture_path("address-book.json")).unwrap();
    EnvGlobals::new(137)
        .with_chains(ChainDirectory::from_file(&fixture_path("chains.json")).unwrap())
        .with_address_book(Arc::new(book))
}

fn renderer() -> TemplateRenderer {
    init_environment(&[fixture_path("templates")], globals()).unwrap()
}

fn sample_events(chain: Arc<Chain>) -> Vec<Event> {
    let registry = EventRegistry::new();
    registry.load_paths(&[fixture_path("abis")]).unwrap();
    let text = std::fs::read_to_string(fixture_path("samples/alchemy-sample.json")).unwrap();
    let payload: Value = serde_json::from_str(&text).unwrap();
    EventDecoder::new(registry).decode_graphql(&payload, chain).unwrap()
}

#[test]
fn loads_templates_by_relative_name() {
    let r = renderer();
    let mut names: Vec<_> = r.template_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec!["ERC20-transfer.md.j2", "access-control.md.j2", "generic-event.md.j2"]
    );
}

#[test]
fn missing_search_path_is_skipped() {
    let r = init_environment(&[fixture_path("no-such-dir"), fixture_path("templates")], globals())
        .unwrap();
    assert_eq!(r.template_names().count(), 3);
}

#[test]
fn renders_sample_transfer() {
    let r = renderer();
    let events = sample_events(r.globals().chain());
    let transfer = events.iter().find(|e| e.name == "Transfer").unwrap();
    assert_eq!(transfer.block().chain.name, "Polygon Mainnet");
    assert_eq!(
        r.render("ERC20-transfer.md.j2", transfer).unwrap(),
        "Transfer 10000 from 0xD758aF6BFC2f0908D7C5f89942be52C36a6b3cab \
         to 0x8fca634A6EDEc7161dEF4478e94B930Ea275A8a2"
    );
}

#[test]
fn generic_template_uses_address_book() {
    let r = renderer();
    let events = sample_events(r.globals().chain());
    let policy = events.iter().find(|e| e.name == "NewPolicy").unwrap();
    let text = r.render("generic-event.md.j2", policy).unwrap();
    assert!(text.starts_with("**NewPolicy** on PolicyPool"));
    assert!(text
        .to_lowercase()
        .contains("- riskmodule: 0x0d175cb042dd6997ac37588954fc5a7b8bab5615"));
}

#[test]
fn transfer_template_fails_on_other_events() {
    let r = renderer();
    let events = sample_events(r.globals().chain());
    let policy = events.iter().find(|e| e.name == "NewPolicy").unwrap();
    assert!(matches!(
        r.render("ERC20-transfer.md.j2", policy),
        Err(RenderError::Render { .. })
    ));
    assert_eq!(
        r.render_first(&["ERC20-transfer.md.j2", "generic-event.md.j2"], policy)
            .unwrap()
            .lines()
            .next(),
        Some("**NewPolicy** on PolicyPool")
    );
}

#[test]
fn args_iterate_in_declaration_order() {
    let mut r = renderer();
    r.add_raw_template("arg-names", "{% for name, value in evt.args %}{{ name }} {% endfor %}")
        .unwrap();
    let events = sample_events(r.globals().chain());
    let policy = events.iter().find(|e| e.name == "NewPolicy").unwrap();
    assert_eq!(r.render("arg-names", policy).unwrap().trim_end(), "riskModule policy");

    let generic = r.render("generic-event.md.j2", policy).unwrap();
    let risk_module = generic.find("- riskModule:").unwrap();
    let policy_line = generic.find("- policy:").unwrap();
    assert!(risk_module < policy_line);
}
