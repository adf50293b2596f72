use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport, resolve_input};
use crate::context::{Attempt, ProductionContext};
use crate::fixed::Fixed64;
use crate::id::{AntigenId, BloodModelId, InputId};
use crate::input::describe_input;
use crate::liquid::LiquidMixture;
use crate::output::{ForensicFinding, ForensicReport, ProducedOutput};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::rng::RandomSource;
use crate::validation::{ValidationContext, check_liquid_input};
use crate::world::BloodModel;

/// Types the blood in a liquid input against a blood model and reports the
/// result to everyone present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodTypingProduct {
    #[serde(default)]
    pub input: Option<InputId>,
    #[serde(default)]
    pub model: Option<BloodModelId>,
}

impl BloodTypingProduct {
    pub fn new(input: InputId, model: BloodModelId) -> Self {
        Self {
            input: Some(input),
            model: Some(model),
        }
    }
}

/// The mixture a liquid input consumed.
pub(crate) fn consumed_liquid<'a>(
    attempt: &Attempt<'a>,
    input: Option<InputId>,
) -> Result<&'a LiquidMixture, ProductionError> {
    let input = input.ok_or(ProductionError::NotConfigured("liquid input"))?;
    attempt
        .consumed
        .get(input)
        .ok_or(ProductionError::InputNotConsumed(input))?
        .liquid()
        .ok_or(ProductionError::InputEmpty(input))
}

/// Point `slot` at a liquid input chosen by ordinal.
pub(crate) fn edit_liquid_input(
    slot: &mut Option<InputId>,
    tokens: &mut CommandTokens,
    ctx: &EditContext<'_>,
    role: &str,
) -> Result<EditReport, EditError> {
    let text = tokens.pop().ok_or(EditError::MissingArgument {
        usage: "<command> <#>",
    })?;
    let (index, input) = resolve_input(ctx.inputs, &text)?;
    if !input.kind.is_liquid() {
        return Err(EditError::IncompatibleInput {
            ordinal: index + 1,
            actual: input.kind.name(),
            expected: "a liquid input",
        });
    }
    *slot = Some(input.id);
    Ok(EditReport::new(format!(
        "This product now tests input ${} as its {role}.",
        index + 1
    )))
}

/// Antigens carried by every sample whose type belongs to `model`.
pub fn observed_antigens(model: &BloodModel, mixture: &LiquidMixture) -> BTreeSet<AntigenId> {
    mixture
        .blood_samples()
        .filter_map(|sample| sample.blood_type)
        .filter_map(|id| model.blood_type(id))
        .flat_map(|t| t.antigens.iter().copied())
        .collect()
}

/// Simulated test error: add one absent antigen or remove one present one.
/// When the chosen change is impossible the other is made instead.
pub fn corrupt_antigens(
    model: &BloodModel,
    observed: &mut BTreeSet<AntigenId>,
    rng: &mut dyn RandomSource,
) {
    let absent: Vec<AntigenId> = model
        .antigens
        .iter()
        .map(|a| a.id)
        .filter(|id| !observed.contains(id))
        .collect();
    let present: Vec<AntigenId> = observed.iter().copied().collect();
    let add = rng.roll(Fixed64::from_num(0.5));
    match (add, absent.is_empty(), present.is_empty()) {
        (true, false, _) | (false, false, true) => {
            observed.insert(absent[rng.pick(absent.len())]);
        }
        (false, _, false) | (true, true, false) => {
            observed.remove(&present[rng.pick(present.len())]);
        }
        _ => {}
    }
}

fn report_text(model: &BloodModel, observed: &BTreeSet<AntigenId>, matched: Option<&str>) -> String {
    let findings = if observed.is_empty() {
        "no antigens".to_string()
    } else {
        let names: Vec<String> = observed.iter().map(|a| model.antigen_name(*a)).collect();
        format!("the antigens {}", names.join(", "))
    };
    match matched {
        Some(name) => format!(
            "The blood test detects {findings}, a match for blood type {name}."
        ),
        None => format!(
            "The blood test detects {findings}; no {} blood type is an exact match.",
            model.name
        ),
    }
}

impl ProductVariant for BloodTypingProduct {
    const TAG: &'static str = "blood-typing";
    const HELP: &'static str = "\
input <#> - sets the liquid input that holds the blood sample
model <blood model> - sets the blood model to type against";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let mixture = consumed_liquid(attempt, self.input)?;
        let model_id = self
            .model
            .ok_or(ProductionError::NotConfigured("blood model"))?;
        let model = ctx
            .world
            .blood_model(model_id)
            .ok_or_else(|| ProductionError::missing("blood model", model_id))?;

        let mut observed = observed_antigens(&model, mixture);
        if ctx.rng.roll(ctx.config.forensic_error_rate()) {
            corrupt_antigens(&model, &mut observed, ctx.rng);
        }
        let matched = model.exact_match(&observed);
        let text = report_text(&model, &observed, matched.map(|t| t.name.as_str()));
        let finding = ForensicFinding::BloodType {
            matched: matched.map(|t| t.id),
            antigens: observed,
        };
        Ok(ProducedOutput::forensic(
            attempt.product,
            ForensicReport {
                text,
                finding,
                samples: vec![mixture.clone()],
            },
        ))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        if let Some(reason) = check_liquid_input(ctx.inputs, self.input, "blood sample") {
            return Some(reason);
        }
        let Some(model) = self.model else {
            return Some("You must set a blood model for this product to test against.".into());
        };
        if ctx.catalog.blood_model(model).is_none() {
            return Some(format!("The blood model {model} no longer exists."));
        }
        None
    }

    fn remapped(&self, remap: &RevisionRemap) -> Self {
        Self {
            input: remap.input(self.input),
            model: self.model,
        }
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let model = self
            .model
            .and_then(|m| ctx.catalog.blood_model(m))
            .map(|m| m.name)
            .unwrap_or_else(|| "an unset model".into());
        format!(
            "a blood typing of {} against {model}",
            describe_input(ctx.inputs, self.input)
        )
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        match command {
            "input" => edit_liquid_input(&mut self.input, tokens, ctx, "blood sample"),
            "model" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "model <blood model>",
                })?;
                let model = ctx
                    .catalog
                    .find_blood_model(&text)
                    .ok_or(EditError::UnknownName {
                        kind: "blood model",
                        text,
                    })?;
                self.model = Some(model.id);
                Ok(EditReport::new(format!(
                    "This product now types blood against the {} model.",
                    model.name
                )))
            }
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{CharacterId, LiquidId};
    use crate::input::{ConsumedInput, ConsumedInputs, InputKind, RecipeInput};
    use crate::item::ItemQuality;
    use crate::liquid::{BloodSample, LiquidInstance};
    use crate::test_utils::{TestHarness, actor};

    fn abo(harness: &mut TestHarness) -> BloodModelId {
        harness.world.add_blood_model(
            "ABO",
            &["A", "B"],
            &[("A", &["A"]), ("B", &["B"]), ("AB", &["A", "B"])],
        )
    }

    fn sample_of(harness: &TestHarness, model: BloodModelId, type_name: &str) -> ConsumedInputs {
        let blood_type = harness.world.blood_type_named(model, type_name);
        let mixture = LiquidMixture::new(vec![LiquidInstance::blood(
            LiquidId(1),
            Fixed64::from_num(0.1),
            BloodSample {
                donor: CharacterId(7),
                blood_type: Some(blood_type),
            },
        )]);
        ConsumedInputs::new().with(InputId(1), ConsumedInput::Liquid(mixture))
    }

    fn setup() -> (TestHarness, BloodModelId) {
        let mut harness = TestHarness::new();
        let model = abo(&mut harness);
        harness.inputs = vec![RecipeInput::new(InputId(1), InputKind::Liquid)];
        (harness, model)
    }

    #[test]
    fn exact_match_without_error() {
        let (mut harness, model) = setup();
        harness.config.forensic_error_rate = 0.0;
        let consumed = sample_of(&harness, model, "AB");
        let product = BloodTypingProduct::new(InputId(1), model);
        assert!(product.why_not_valid(&harness.validation()).is_none());

        let output = harness
            .produce(&product, &consumed, ItemQuality::Standard)
            .unwrap();
        let report = output.report().unwrap();
        let ab = harness.world.blood_type_named(model, "AB");
        assert!(matches!(
            report.finding,
            ForensicFinding::BloodType { matched: Some(t), .. } if t == ab
        ));
        assert!(report.text.contains("blood type AB"));
        assert!(output.created().is_empty());
    }

    #[test]
    fn forced_removal_leaves_no_match() {
        let (mut harness, model) = setup();
        let consumed = sample_of(&harness, model, "A");
        // error roll, then "add?" roll
        harness.rng.push_roll(true);
        harness.rng.push_roll(false);
        let output = harness
            .produce(&BloodTypingProduct::new(InputId(1), model), &consumed, ItemQuality::Standard)
            .unwrap();
        let report = output.report().unwrap();
        match &report.finding {
            ForensicFinding::BloodType { antigens, matched } => {
                assert!(antigens.is_empty());
                assert_eq!(*matched, None);
            }
            other => panic!("unexpected finding {other:?}"),
        }
        assert!(report.text.contains("no ABO blood type is an exact match"));
    }

    #[test]
    fn corruption_falls_back_when_nothing_to_add() {
        let (mut harness, model) = setup();
        let info = harness.world.blood_model_info(model);
        let mut observed: BTreeSet<_> = info.antigens.iter().map(|a| a.id).collect();
        harness.rng.push_roll(true);
        corrupt_antigens(&info, &mut observed, &mut harness.rng);
        assert_eq!(observed.len(), 1);
    }

    #[test]
    fn validity() {
        let (mut harness, model) = setup();
        harness
            .inputs
            .push(RecipeInput::new(InputId(2), InputKind::Item));
        let ctx = harness.validation();
        assert!(BloodTypingProduct::default().why_not_valid(&ctx).is_some());
        assert!(
            BloodTypingProduct::new(InputId(2), model)
                .why_not_valid(&ctx)
                .unwrap()
                .contains("must consume a liquid")
        );
        let no_model = BloodTypingProduct {
            input: Some(InputId(1)),
            model: None,
        };
        assert!(no_model.why_not_valid(&ctx).unwrap().contains("blood model"));
    }

    #[test]
    fn edit_commands() {
        let (harness, _) = setup();
        let actor = actor();
        let ctx = harness.edit_context(&actor);
        let mut product = BloodTypingProduct::default();
        product
            .edit("input", &mut CommandTokens::parse("1"), &ctx)
            .unwrap();
        product
            .edit("model", &mut CommandTokens::parse("abo"), &ctx)
            .unwrap();
        assert!(product.why_not_valid(&harness.validation()).is_none());
    }
}
