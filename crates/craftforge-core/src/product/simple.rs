use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::output::ProducedOutput;
use crate::product::template::{ItemTemplate, TEMPLATE_HELP};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;

/// Loads a fixed item: a prototype, a quantity and an optional skin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleProduct {
    #[serde(default)]
    pub template: ItemTemplate,
}

impl SimpleProduct {
    pub fn new(template: ItemTemplate) -> Self {
        Self { template }
    }
}

impl ProductVariant for SimpleProduct {
    const TAG: &'static str = "simple";
    const HELP: &'static str = TEMPLATE_HELP;

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let entities = self.template.spawn(attempt, ctx, Vec::new())?;
        Ok(ProducedOutput::entities(attempt.product, entities))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        self.template.why_not_valid(ctx.catalog)
    }

    fn remapped(&self, _remap: &RevisionRemap) -> Self {
        self.clone()
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        self.template.describe(ctx.catalog)
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        self.template
            .edit(command, tokens, ctx)
            .unwrap_or_else(|| Err(unknown_command(Self::HELP)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemQuality;
    use crate::test_utils::{TestHarness, TestWorld};

    #[test]
    fn stackable_target_makes_one_stack() {
        let mut harness = TestHarness::new();
        let nail = harness.world.add_prototype("nail", true, vec![]);
        let product = SimpleProduct::new(ItemTemplate::new(nail, 12));
        let output = harness.produce(&product, &Default::default(), ItemQuality::Good);
        let output = output.unwrap();
        assert_eq!(output.created().len(), 1);
        let info = harness.world.entity_info(output.created()[0]).unwrap();
        assert_eq!(info.quantity, 12);
        assert_eq!(info.prototype, nail);
        assert_eq!(info.quality, ItemQuality::Good);
    }

    #[test]
    fn unstackable_target_makes_discrete_items() {
        let mut harness = TestHarness::new();
        let sword = harness.world.add_prototype("sword", false, vec![]);
        let product = SimpleProduct::new(ItemTemplate::new(sword, 3));
        let output = harness
            .produce(&product, &Default::default(), ItemQuality::Poor)
            .unwrap();
        assert_eq!(output.created().len(), 3);
        for &id in output.created() {
            assert_eq!(harness.world.entity_info(id).unwrap().quantity, 1);
        }
    }

    #[test]
    fn disabled_quality_keeps_prototype_default() {
        let mut harness = TestHarness::new();
        harness.config.disable_quality_calculation = true;
        let sword = harness.world.add_prototype("sword", false, vec![]);
        let product = SimpleProduct::new(ItemTemplate::new(sword, 1));
        let output = harness
            .produce(&product, &Default::default(), ItemQuality::Legendary)
            .unwrap();
        let spawn = harness.world.spawn_of(output.created()[0]).unwrap();
        assert_eq!(spawn.quality, None);
    }

    #[test]
    fn validity_requires_target() {
        let world = TestWorld::new();
        let ctx = ValidationContext::new(&[], &world);
        assert!(SimpleProduct::default().why_not_valid(&ctx).is_some());
    }

    #[test]
    fn unknown_command_returns_help() {
        let world = TestWorld::new();
        let actor = crate::test_utils::actor();
        let ctx = EditContext {
            catalog: &world,
            inputs: &[],
            actor: &actor,
        };
        let mut product = SimpleProduct::default();
        let err = product
            .edit("frobnicate", &mut CommandTokens::default(), &ctx)
            .unwrap_err();
        match err {
            EditError::UnknownCommand { help } => {
                assert!(help.contains("quantity <#>"));
                assert!(help.contains("materialinput"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
