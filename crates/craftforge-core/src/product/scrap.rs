use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport, resolve_input};
use crate::context::{Attempt, ProductionContext};
use crate::fixed::{Fixed64, checked_mul_64, format_percentage, parse_percentage};
use crate::id::{EntityId, InputId, TagId};
use crate::input::describe_input;
use crate::item::CommoditySpawn;
use crate::output::ProducedOutput;
use crate::product::commodity::{edit_tag, tag_suffix};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::{ValidationContext, check_item_input, check_percentage};

/// Turns what an item input consumed back into raw material: one pile of
/// the consumed items' material, weighing a share of their total weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapProduct {
    #[serde(default)]
    pub input: Option<InputId>,
    #[serde(with = "crate::fixed::decimal", default = "whole")]
    pub percentage: Fixed64,
    #[serde(default)]
    pub tag: Option<TagId>,
}

pub(crate) fn whole() -> Fixed64 {
    Fixed64::from_num(1)
}

impl Default for ScrapProduct {
    fn default() -> Self {
        Self {
            input: None,
            percentage: whole(),
            tag: None,
        }
    }
}

impl ScrapProduct {
    pub fn new(input: InputId, percentage: Fixed64) -> Self {
        Self {
            input: Some(input),
            percentage,
            tag: None,
        }
    }
}

/// The consumed entities of an item input, which must not be empty.
pub(crate) fn consumed_items<'a>(
    attempt: &Attempt<'a>,
    input: Option<InputId>,
) -> Result<&'a [EntityId], ProductionError> {
    let input = input.ok_or(ProductionError::NotConfigured("input"))?;
    let items = attempt
        .consumed
        .get(input)
        .ok_or(ProductionError::InputNotConsumed(input))?
        .items();
    if items.is_empty() {
        return Err(ProductionError::InputEmpty(input));
    }
    Ok(items)
}

/// Parse the `input <#>` command shared by the recovery variants.
pub(crate) fn edit_item_input(
    slot: &mut Option<InputId>,
    tokens: &mut CommandTokens,
    ctx: &EditContext<'_>,
) -> Result<EditReport, EditError> {
    let text = tokens.pop().ok_or(EditError::MissingArgument {
        usage: "input <#>",
    })?;
    let (index, input) = resolve_input(ctx.inputs, &text)?;
    if !input.kind.consumes_items() {
        return Err(EditError::IncompatibleInput {
            ordinal: index + 1,
            actual: input.kind.name(),
            expected: "an item input",
        });
    }
    *slot = Some(input.id);
    Ok(EditReport::new(format!(
        "This product now recovers what input ${} consumed.",
        index + 1
    )))
}

/// Parse the `percentage <%>` command shared by the recovery variants.
pub(crate) fn edit_percentage(
    slot: &mut Fixed64,
    tokens: &mut CommandTokens,
) -> Result<EditReport, EditError> {
    let text = tokens.pop().ok_or(EditError::MissingArgument {
        usage: "percentage <%>",
    })?;
    let value = parse_percentage(&text)
        .filter(|p| check_percentage(*p, "recovery").is_none())
        .ok_or_else(|| {
            EditError::InvalidArgument(format!(
                "\"{text}\" is not a valid percentage; it must be greater than 0% and at most 100%."
            ))
        })?;
    *slot = value;
    Ok(EditReport::new(format!(
        "This product now recovers {}.",
        format_percentage(value)
    )))
}

impl ProductVariant for ScrapProduct {
    const TAG: &'static str = "scrap-input";
    const HELP: &'static str = "\
input <#> - sets the item input to scrap
percentage <%> - sets how much of the consumed weight is recovered
tag <tag> - tags the recovered material
tag none - clears the tag";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let items = consumed_items(attempt, self.input)?;
        let mut total = Fixed64::ZERO;
        let mut material = None;
        for &entity in items {
            let info = ctx
                .world
                .entity(entity)
                .ok_or(ProductionError::MissingEntity(entity))?;
            total = total.saturating_add(info.weight);
            material = material.or(info.material);
        }
        let material = material.ok_or(ProductionError::NotConfigured("material of the scrapped items"))?;
        let weight = checked_mul_64(total, self.percentage).unwrap_or(Fixed64::MAX);
        let pile = ctx.create_commodity(
            attempt.product,
            CommoditySpawn {
                material,
                weight,
                tag: self.tag,
            },
        );
        Ok(ProducedOutput::entities(attempt.product, vec![pile]))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        check_item_input(ctx.inputs, self.input, "scrapped")
            .or_else(|| check_percentage(self.percentage, "recovery"))
            .or_else(|| {
                let tag = self.tag?;
                ctx.catalog
                    .tag(tag)
                    .is_none()
                    .then(|| format!("The tag {tag} no longer exists."))
            })
    }

    fn remapped(&self, remap: &RevisionRemap) -> Self {
        Self {
            input: remap.input(self.input),
            ..self.clone()
        }
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        format!(
            "{} of the weight of {} as raw material{}",
            format_percentage(self.percentage),
            describe_input(ctx.inputs, self.input),
            tag_suffix(ctx.catalog, self.tag)
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
            "tag" => edit_tag(&mut self.tag, tokens, ctx),
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
