use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::fixed::{Fixed64, parse_fixed};
use crate::id::{MaterialId, TagId};
use crate::item::CommoditySpawn;
use crate::output::ProducedOutput;
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;
use crate::world::WorldCatalog;

/// Loads a raw-material pile of a fixed material and weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityProduct {
    #[serde(default)]
    pub material: Option<MaterialId>,
    #[serde(with = "crate::fixed::decimal", default = "zero")]
    pub weight: Fixed64,
    #[serde(default)]
    pub tag: Option<TagId>,
}

pub(crate) fn zero() -> Fixed64 {
    Fixed64::ZERO
}

impl Default for CommodityProduct {
    fn default() -> Self {
        Self {
            material: None,
            weight: Fixed64::ZERO,
            tag: None,
        }
    }
}

impl CommodityProduct {
    pub fn new(material: MaterialId, weight: Fixed64) -> Self {
        Self {
            material: Some(material),
            weight,
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: TagId) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Name of an optional tag for operator output.
pub(crate) fn tag_suffix(catalog: &dyn WorldCatalog, tag: Option<TagId>) -> String {
    match tag {
        Some(tag) => match catalog.tag(tag) {
            Some(info) => format!(" tagged {}", info.name),
            None => format!(" tagged {tag} (missing)"),
        },
        None => String::new(),
    }
}

/// Parse `tag <name>` / `tag none`.
pub(crate) fn edit_tag(
    slot: &mut Option<TagId>,
    tokens: &mut CommandTokens,
    ctx: &EditContext<'_>,
) -> Result<EditReport, EditError> {
    let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
        usage: "tag <tag> | tag none",
    })?;
    if text.eq_ignore_ascii_case("none") {
        *slot = None;
        return Ok(EditReport::new("This product no longer tags its output."));
    }
    let tag = ctx
        .catalog
        .find_tag(&text)
        .ok_or(EditError::UnknownName { kind: "tag", text })?;
    *slot = Some(tag.id);
    Ok(EditReport::new(format!(
        "This product now tags its output as {}.",
        tag.name
    )))
}

impl ProductVariant for CommodityProduct {
    const TAG: &'static str = "commodity";
    const HELP: &'static str = "\
material <material> - sets the material of the pile
weight <amount> - sets the weight of the pile
tag <tag> - tags the pile
tag none - clears the tag";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let material = attempt
            .material
            .or(self.material)
            .ok_or(ProductionError::NotConfigured("material"))?;
        let entity = ctx.create_commodity(
            attempt.product,
            CommoditySpawn {
                material,
                weight: self.weight,
                tag: self.tag,
            },
        );
        Ok(ProducedOutput::entities(attempt.product, vec![entity]))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        let Some(material) = self.material else {
            return Some("You must set a material for this product to load.".into());
        };
        if ctx.catalog.material(material).is_none() {
            return Some(format!("The material {material} no longer exists."));
        }
        if self.weight <= Fixed64::ZERO {
            return Some("The weight must be greater than zero.".into());
        }
        if let Some(tag) = self.tag
            && ctx.catalog.tag(tag).is_none()
        {
            return Some(format!("The tag {tag} no longer exists."));
        }
        None
    }

    fn remapped(&self, _remap: &RevisionRemap) -> Self {
        self.clone()
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let material = self
            .material
            .and_then(|m| ctx.catalog.material(m))
            .map(|m| m.name)
            .unwrap_or_else(|| "an unset material".into());
        format!(
            "{} of {material}{}",
            self.weight,
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
            "material" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "material <material>",
                })?;
                let material = ctx
                    .catalog
                    .find_material(&text)
                    .ok_or(EditError::UnknownName {
                        kind: "material",
                        text,
                    })?;
                self.material = Some(material.id);
                Ok(EditReport::new(format!(
                    "This product now loads a pile of {}.",
                    material.name
                )))
            }
            "weight" => {
                let text = tokens.pop().ok_or(EditError::MissingArgument {
                    usage: "weight <amount>",
                })?;
                let weight = parse_fixed(&text)
                    .filter(|w| *w > Fixed64::ZERO)
                    .ok_or_else(|| {
                        EditError::InvalidArgument(format!(
                            "\"{text}\" is not a valid weight; it must be a number greater than zero."
                        ))
                    })?;
                self.weight = weight;
                Ok(EditReport::new(format!(
                    "This product now loads a pile weighing {weight}."
                )))
            }
            "tag" => edit_tag(&mut self.tag, tokens, ctx),
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
