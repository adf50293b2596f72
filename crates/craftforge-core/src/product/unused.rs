use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::fixed::{BASIS_POINTS, Fixed64, basis_points, format_percentage};
use crate::id::InputId;
use crate::input::describe_input;
use crate::item::ItemSpawn;
use crate::output::ProducedOutput;
use crate::product::scrap::{consumed_items, edit_item_input, edit_percentage, whole};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::{ValidationContext, check_item_input, check_percentage};

/// Hands back intact copies of what an item input consumed, fewer when the
/// recovery percentage is below 100%.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedInputProduct {
    #[serde(default)]
    pub input: Option<InputId>,
    #[serde(with = "crate::fixed::decimal", default = "whole")]
    pub percentage: Fixed64,
}

impl Default for UnusedInputProduct {
    fn default() -> Self {
        Self {
            input: None,
            percentage: whole(),
        }
    }
}

/// How many copies come back from `consumed`: `ceil(consumed × percentage)`
/// at whole-basis-point precision, at least one, never more than were
/// consumed.
pub fn recovered_quantity(consumed: u32, percentage: Fixed64) -> u32 {
    if consumed == 0 {
        return 0;
    }
    let recovered = (consumed as u64 * basis_points(percentage)).div_ceil(BASIS_POINTS);
    recovered.clamp(1, consumed as u64) as u32
}

impl UnusedInputProduct {
    pub fn new(input: InputId, percentage: Fixed64) -> Self {
        Self {
            input: Some(input),
            percentage,
        }
    }
}

impl ProductVariant for UnusedInputProduct {
    const TAG: &'static str = "unused-input";
    const HELP: &'static str = "\
input <#> - sets the item input to hand back
percentage <%> - sets how much of the consumed quantity is handed back";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let items = consumed_items(attempt, self.input)?;
        let mut lead = None;
        let mut consumed: u32 = 0;
        for &entity in items {
            let info = ctx
                .world
                .entity(entity)
                .ok_or(ProductionError::MissingEntity(entity))?;
            consumed = consumed.saturating_add(info.quantity);
            lead.get_or_insert(info);
        }
        let Some(lead) = lead else {
            return Err(ProductionError::NotConfigured("input"));
        };
        let prototype = ctx
            .world
            .prototype(lead.prototype)
            .ok_or_else(|| ProductionError::missing("item prototype", lead.prototype))?;
        let base = ItemSpawn {
            quality: Some(lead.quality),
            skin: lead.skin,
            material: lead.material,
            ..ItemSpawn::new(lead.prototype, 1)
        };
        let quantity = recovered_quantity(consumed, self.percentage);
        let entities = ctx.create_copies(attempt.product, &prototype, quantity, base);
        Ok(ProducedOutput::entities(attempt.product, entities))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        check_item_input(ctx.inputs, self.input, "returned")
            .or_else(|| check_percentage(self.percentage, "recovery"))
    }

    fn remapped(&self, remap: &RevisionRemap) -> Self {
        Self {
            input: remap.input(self.input),
            ..self.clone()
        }
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        format!(
            "{} of what {} consumed, handed back intact",
            format_percentage(self.percentage),
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
            "input" => edit_item_input(&mut self.input, tokens, ctx),
            "percentage" | "percent" => edit_percentage(&mut self.percentage, tokens),
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
