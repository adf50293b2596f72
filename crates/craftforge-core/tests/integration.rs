//! Integration tests for the craftforge production engine.
//!
//! These tests exercise whole recipe revisions end to end: editing products
//! through the command protocol, validating, producing from a consumed-input
//! snapshot, releasing outputs, saving mid-craft, and revising the recipe.

use craftforge_core::event::{EventKind, ProductionEvent};
use craftforge_core::fixed::Fixed64;
use craftforge_core::id::*;
use craftforge_core::input::{ConsumedInput, ConsumedInputs, InputKind, RecipeInput};
use craftforge_core::item::ItemQuality;
use craftforge_core::output::ProducedOutput;
use craftforge_core::product::Product;
use craftforge_core::recipe::RecipeRevision;
use craftforge_core::registry::ProductRegistry;
use craftforge_core::test_utils::*;
use craftforge_core::world::Layer;

// ===========================================================================
// Helpers
// ===========================================================================

struct Workshop {
    harness: TestHarness,
    recipe: RecipeRevision,
    plank: PrototypeId,
    oak: MaterialId,
    colour: CharacteristicId,
}

/// A carpentry recipe: input $1 is a group of planks, input $2 a single
/// plank whose colour the product copies.
fn workshop() -> Workshop {
    let mut harness = TestHarness::new();
    let colour = harness.world.add_characteristic("colour", &["pale", "dark"]);
    let plank = harness.world.add_prototype("plank", true, vec![]);
    harness.world.add_prototype("stool", false, vec![colour]);
    let oak = harness.world.add_material("oak");
    harness.world.add_tag("sawdust");
    let inputs = vec![
        RecipeInput::new(InputId(1), InputKind::ItemGroup).with_description("planks"),
        RecipeInput::new(InputId(2), InputKind::Item).determining(colour),
    ];
    harness.inputs = inputs.clone();
    Workshop {
        harness,
        recipe: RecipeRevision::new(RecipeId(40), 1, inputs),
        plank,
        oak,
        colour,
    }
}

fn edit(w: &mut Workshop, product: ProductId, line: &str) {
    let actor = actor();
    if let Err(err) = w.recipe.apply_edit(product, line, &w.harness.world, &actor) {
        panic!("edit {line:?} on {product} failed: {err}");
    }
}

fn produce(w: &mut Workshop, failure: bool, consumed: &ConsumedInputs) -> Vec<ProducedOutput> {
    let TestHarness {
        world,
        scripts,
        rng,
        config,
        ..
    } = &mut w.harness;
    let mut ctx = w.recipe.production_context(world, scripts, rng, config);
    w.recipe
        .produce(failure, consumed, ItemQuality::Good, &mut ctx)
        .unwrap()
}

// ===========================================================================
// Test 1: edit, validate, produce, release
// ===========================================================================

#[test]
fn carpentry_recipe_end_to_end() {
    let registry = ProductRegistry::builtin();
    let mut w = workshop();

    let stool = w.recipe.add_product(&registry, "variable", false, &w.harness.world).unwrap();
    edit(&mut w, stool, "item stool");
    assert!(!w.recipe.is_valid(&w.harness.world));
    edit(&mut w, stool, "bind colour $2");
    edit(&mut w, stool, "quantity 2");
    assert_eq!(w.recipe.why_not_valid(&w.harness.world), None);

    let scrap = w.recipe.add_product(&registry, "scrap-input", true, &w.harness.world).unwrap();
    edit(&mut w, scrap, "input 1");
    edit(&mut w, scrap, "percentage 25%");
    edit(&mut w, scrap, "tag sawdust");
    assert!(w.recipe.is_valid(&w.harness.world));

    let colour = w.colour;
    let dark = w.harness.world.value_named(colour, "dark");
    let planks = w
        .harness
        .world
        .add_item_of(w.plank, 4, Fixed64::from_num(10), w.oak);
    let sample = w.harness.world.add_item(w.plank, 1);
    w.harness.world.set_characteristic(sample, colour, dark);
    let consumed = ConsumedInputs::new()
        .with(InputId(1), ConsumedInput::ItemGroup(vec![planks]))
        .with(InputId(2), ConsumedInput::Item(sample));

    // Success releases two dark stools.
    let outputs = produce(&mut w, false, &consumed);
    assert_eq!(outputs.len(), 1);
    let stools = outputs[0].created().to_vec();
    assert_eq!(stools.len(), 2);
    for &id in &stools {
        let spawn = w.harness.world.spawn_of(id).unwrap();
        assert_eq!(spawn.characteristics, vec![(colour, dark)]);
        assert_eq!(spawn.quality, Some(ItemQuality::Good));
    }
    for output in outputs {
        output.release_into(&mut w.harness.world, LocationId(3), Layer::GroundLevel);
    }
    assert_eq!(
        w.harness.world.entity_state(stools[0]),
        Some(EntityState::Placed(LocationId(3), Layer::GroundLevel))
    );

    // Failure turns the planks into sawdust instead.
    let outputs = produce(&mut w, true, &consumed);
    let pile = w.harness.world.commodity_of(outputs[0].created()[0]).unwrap();
    assert_eq!(pile.material, w.oak);
    assert_eq!(pile.weight, Fixed64::from_num(2.5));
    assert!(pile.tag.is_some());

    let created = w
        .harness
        .world
        .events
        .of_kind(EventKind::EntityCreated)
        .count();
    assert_eq!(created, 3);
    assert_eq!(w.harness.world.events.of_kind(EventKind::OutputReleased).count(), 1);
}

// ===========================================================================
// Test 2: persistence and revision
// ===========================================================================

#[test]
fn records_reload_and_survive_a_revision() {
    let registry = ProductRegistry::builtin();
    let mut w = workshop();
    let unused = w.recipe.add_product(&registry, "unused-input", true, &w.harness.world).unwrap();
    edit(&mut w, unused, "input $1");
    edit(&mut w, unused, "percentage 50%");
    let records = w.recipe.dirty_records().unwrap();
    assert_eq!(records.len(), 1);
    w.recipe.mark_saved();
    assert!(!w.recipe.dirty().is_dirty());

    // Reload into a fresh revision object, as the host does at startup.
    let mut reloaded = RecipeRevision::new(RecipeId(40), 1, w.recipe.inputs().to_vec());
    assert_eq!(reloaded.load_products(&registry, &records), 0);
    assert_eq!(reloaded.products(), w.recipe.products());
    assert!(reloaded.is_valid(&w.harness.world));

    // Revise: inputs get fresh ids and the reference follows.
    let next = reloaded.revise(&registry).unwrap();
    let new_first = next.inputs()[0].id;
    assert_ne!(new_first, InputId(1));
    let carried: &Product = &next.products()[0];
    assert_eq!(
        carried.serialize_definition().unwrap()["input"],
        serde_json::json!(new_first.0)
    );
    let mut harness = TestHarness::new();
    harness.inputs = next.inputs().to_vec();
    assert!(carried.why_not_valid(&harness.validation()).is_none());
    assert_eq!(next.dirty().dirty_products().len(), 1);
}

// ===========================================================================
// Test 3: mid-craft save of an output
// ===========================================================================

#[test]
fn output_survives_a_mid_craft_save() {
    let registry = ProductRegistry::builtin();
    let mut w = workshop();
    let simple = w.recipe.add_product(&registry, "simple", false, &w.harness.world).unwrap();
    edit(&mut w, simple, "item plank");
    edit(&mut w, simple, "quantity 7");

    let outputs = produce(&mut w, false, &ConsumedInputs::new());
    let bytes = outputs[0].to_bytes().unwrap();
    let mut restored = ProducedOutput::from_bytes(&bytes).unwrap();
    assert_eq!(restored, outputs[0]);
    restored.finalize_after_load(&mut w.harness.world);
    let stack = restored.created()[0];
    assert_eq!(
        w.harness.world.entity_state(stack),
        Some(EntityState::Finalized)
    );
    assert_eq!(w.harness.world.entity_info(stack).unwrap().quantity, 7);
    restored.quit(&mut w.harness.world);
    assert!(matches!(
        w.harness.world.events.events().last(),
        Some(ProductionEvent::OutputDiscarded { deleted: false, .. })
    ));
}
