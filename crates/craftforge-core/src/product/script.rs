use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::event::ProductionEvent;
use crate::id::{EntityId, ScriptId};
use crate::output::ProducedOutput;
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;
use crate::world::{ScriptType, ScriptValue};

/// Hands the whole output over to a script.
///
/// The script is called with two dictionaries keyed by input ordinal
/// (`"1"`, `"2"`...): consumed items, then consumed liquids. It must return
/// an item or a collection of items; those become the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptProduct {
    #[serde(default)]
    pub script: Option<ScriptId>,
}

pub const SCRIPT_PARAMETERS: [ScriptType; 2] = [ScriptType::Dictionary, ScriptType::Dictionary];

impl ScriptProduct {
    pub fn new(script: ScriptId) -> Self {
        Self {
            script: Some(script),
        }
    }
}

/// The two positional arguments: items by ordinal, liquids by ordinal.
fn arguments(attempt: &Attempt<'_>, ctx: &ProductionContext<'_>) -> Vec<ScriptValue> {
    let mut items = BTreeMap::new();
    let mut liquids = BTreeMap::new();
    for (index, input) in ctx.inputs.iter().enumerate() {
        let Some(consumed) = attempt.consumed.get(input.id) else {
            continue;
        };
        let key = (index + 1).to_string();
        if let Some(mixture) = consumed.liquid() {
            liquids.insert(key, ScriptValue::Liquid(mixture.clone()));
            continue;
        }
        match consumed.items() {
            [] => {}
            [single] => {
                items.insert(key, ScriptValue::Item(*single));
            }
            many => {
                items.insert(
                    key,
                    ScriptValue::Collection(many.iter().copied().map(ScriptValue::Item).collect()),
                );
            }
        }
    }
    vec![ScriptValue::Dictionary(items), ScriptValue::Dictionary(liquids)]
}

fn returned_entities(script: ScriptId, value: ScriptValue) -> Result<Vec<EntityId>, ProductionError> {
    let unusable = |found: &ScriptValue| ProductionError::ScriptResult {
        script,
        found: found.type_name().to_string(),
    };
    match value {
        ScriptValue::Item(entity) => Ok(vec![entity]),
        ScriptValue::Collection(values) => values
            .iter()
            .map(|v| match v {
                ScriptValue::Item(entity) => Ok(*entity),
                other => Err(unusable(other)),
            })
            .collect(),
        other => Err(unusable(&other)),
    }
}

impl ProductVariant for ScriptProduct {
    const TAG: &'static str = "script";
    const HELP: &'static str = "\
script <script> - sets the script that makes this product's output
script none - clears the script";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let script = self.script.ok_or(ProductionError::NotConfigured("script"))?;
        let args = arguments(attempt, ctx);
        let returned = ctx.scripts.invoke(script, args);
        let entities = returned_entities(script, returned)?;
        for &entity in &entities {
            ctx.world.notify(ProductionEvent::EntityCreated {
                product: attempt.product,
                entity,
            });
        }
        Ok(ProducedOutput::entities(attempt.product, entities))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        let Some(script) = self.script else {
            return Some("You must set a script for this product to run.".into());
        };
        if ctx.catalog.script(script).is_none() {
            return Some(format!("The script {script} no longer exists."));
        }
        None
    }

    fn remapped(&self, _remap: &RevisionRemap) -> Self {
        self.clone()
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        match self.script.and_then(|s| ctx.catalog.script(s)) {
            Some(info) => format!("whatever the script {} ({}) returns", info.name, info.id),
            None => "whatever an unset script returns".into(),
        }
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        if command != "script" && command != "prog" {
            return Err(unknown_command(Self::HELP));
        }
        let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
            usage: "script <script> | script none",
        })?;
        if text.eq_ignore_ascii_case("none") {
            self.script = None;
            return Ok(EditReport::new("This product no longer runs a script."));
        }
        let info = ctx.catalog.find_script(&text).ok_or(EditError::UnknownName {
            kind: "script",
            text,
        })?;
        let mut message = format!("This product now runs the script {}.", info.name);
        if !info.accepts(&SCRIPT_PARAMETERS) {
            message.push_str(" Note: it does not take two dictionaries as its parameters.");
        }
        self.script = Some(info.id);
        Ok(EditReport::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::fixed::Fixed64;
    use crate::id::{InputId, LiquidId};
    use crate::input::{ConsumedInput, ConsumedInputs, InputKind, RecipeInput};
    use crate::item::ItemQuality;
    use crate::liquid::{LiquidInstance, LiquidMixture};
    use crate::test_utils::{TestHarness, actor};

    #[test]
    fn passes_items_and_liquids_by_ordinal() {
        let mut harness = TestHarness::new();
        let cup = harness.world.add_prototype("cup", false, vec![]);
        let made = harness.world.add_prototype("mug", false, vec![]);
        let script = harness.world.add_script(
            "brew",
            ScriptType::ItemCollection,
            SCRIPT_PARAMETERS.to_vec(),
        );
        let consumed_cup = harness.world.add_item(cup, 1);
        let result = harness.world.add_item(made, 1);
        harness.scripts.respond(
            script,
            ScriptValue::Collection(vec![ScriptValue::Item(result)]),
        );
        harness.inputs = vec![
            RecipeInput::new(InputId(1), InputKind::Item),
            RecipeInput::new(InputId(2), InputKind::Liquid),
        ];
        let water = LiquidMixture::new(vec![LiquidInstance::new(LiquidId(1), Fixed64::from_num(1))]);
        let consumed = ConsumedInputs::new()
            .with(InputId(1), ConsumedInput::Item(consumed_cup))
            .with(InputId(2), ConsumedInput::Liquid(water.clone()));

        let product = ScriptProduct::new(script);
        let output = harness
            .produce(&product, &consumed, ItemQuality::Standard)
            .unwrap();
        assert_eq!(output.created(), &[result]);
        assert_eq!(harness.world.events.of_kind(EventKind::EntityCreated).count(), 1);

        let calls = harness.scripts.calls();
        let ScriptValue::Dictionary(items) = &calls[0].1[0] else {
            panic!("items argument is not a dictionary");
        };
        let ScriptValue::Dictionary(liquids) = &calls[0].1[1] else {
            panic!("liquids argument is not a dictionary");
        };
        assert_eq!(items.get("1"), Some(&ScriptValue::Item(consumed_cup)));
        assert_eq!(liquids.get("2"), Some(&ScriptValue::Liquid(water)));
    }

    #[test]
    fn unusable_return_is_a_production_error() {
        let mut harness = TestHarness::new();
        let script = harness.world.add_script(
            "broken",
            ScriptType::Number,
            SCRIPT_PARAMETERS.to_vec(),
        );
        harness.scripts.respond(script, ScriptValue::Number(3.0));
        let err = harness
            .produce(
                &ScriptProduct::new(script),
                &ConsumedInputs::new(),
                ItemQuality::Standard,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ProductionError::ScriptResult {
                script,
                found: "a number".into()
            }
        );
    }

    #[test]
    fn valid_once_a_script_is_set() {
        let mut harness = TestHarness::new();
        let script = harness.world.add_script("any", ScriptType::Item, vec![]);
        let ctx = harness.validation();
        assert!(ScriptProduct::default().why_not_valid(&ctx).is_some());
        assert!(ScriptProduct::new(script).why_not_valid(&ctx).is_none());
    }

    #[test]
    fn edit_sets_and_clears_the_script() {
        let mut harness = TestHarness::new();
        harness
            .world
            .add_script("forge", ScriptType::Item, SCRIPT_PARAMETERS.to_vec());
        let actor = actor();
        let ctx = harness.edit_context(&actor);
        let mut product = ScriptProduct::default();
        product
            .edit("script", &mut CommandTokens::parse("forge"), &ctx)
            .unwrap();
        assert!(product.script.is_some());
        product
            .edit("script", &mut CommandTokens::parse("none"), &ctx)
            .unwrap();
        assert!(product.script.is_none());
        assert!(matches!(
            product.edit("script", &mut CommandTokens::parse("missing"), &ctx),
            Err(EditError::UnknownName { .. })
        ));
    }
}
