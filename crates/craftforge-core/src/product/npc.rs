use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::id::{NpcTemplateId, ScriptId};
use crate::output::ProducedOutput;
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;
use crate::world::RevisionStatus;

/// Spawns NPCs from an approved template.
///
/// Configuration, validation and editing are complete. Production is not:
/// whether several spawns share a pool and who owns the spawned actor are
/// undecided, so `produce` reports [`ProductionError::NotImplemented`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcProduct {
    #[serde(default)]
    pub template: Option<NpcTemplateId>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub on_load: Option<ScriptId>,
}

fn one() -> u32 {
    1
}

impl Default for NpcProduct {
    fn default() -> Self {
        Self {
            template: None,
            quantity: 1,
            on_load: None,
        }
    }
}

impl NpcProduct {
    pub fn new(template: NpcTemplateId, quantity: u32) -> Self {
        Self {
            template: Some(template),
            quantity,
            on_load: None,
        }
    }
}

impl ProductVariant for NpcProduct {
    const TAG: &'static str = "npc";
    const HELP: &'static str = "\
template <npc template> - sets the template NPCs are spawned from
quantity <#> - sets how many NPCs are spawned
onload <script> - runs a script on each spawned NPC
onload none - clears the on-load script";

    fn produce(
        &self,
        _attempt: &Attempt<'_>,
        _ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        Err(ProductionError::NotImplemented(Self::TAG))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        let Some(template) = self.template else {
            return Some("You must set an NPC template for this product to spawn.".into());
        };
        let Some(info) = ctx.catalog.npc_template(template) else {
            return Some(format!("The NPC template {template} no longer exists."));
        };
        if info.status != RevisionStatus::Current {
            return Some(format!(
                "The NPC template {} is not approved for use.",
                info.name
            ));
        }
        if self.quantity < 1 {
            return Some("The quantity must be at least 1.".into());
        }
        if let Some(script) = self.on_load
            && ctx.catalog.script(script).is_none()
        {
            return Some(format!("The on-load script {script} no longer exists."));
        }
        None
    }

    fn remapped(&self, _remap: &RevisionRemap) -> Self {
        self.clone()
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let template = self
            .template
            .and_then(|t| ctx.catalog.npc_template(t))
            .map(|t| t.name)
            .unwrap_or_else(|| "an unset NPC template".into());
        let on_load = self
            .on_load
            .and_then(|s| ctx.catalog.script(s))
            .map(|s| format!(", running {} on load", s.name))
            .unwrap_or_default();
        format!("{}x NPC from {template}{on_load}", self.quantity)
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        match command {
            "template" | "npc" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "template <npc template>",
                })?;
                let info = ctx
                    .catalog
                    .find_npc_template(&text)
                    .ok_or(EditError::UnknownName {
                        kind: "NPC template",
                        text,
                    })?;
                self.template = Some(info.id);
                Ok(EditReport::new(format!(
                    "This product now spawns NPCs from {}.",
                    info.name
                )))
            }
            "quantity" | "amount" => {
                let text = tokens.pop().ok_or(EditError::MissingArgument {
                    usage: "quantity <#>",
                })?;
                let quantity = text.parse::<u32>().ok().filter(|q| *q >= 1).ok_or_else(|| {
                    EditError::InvalidArgument(format!(
                        "\"{text}\" is not a valid quantity; it must be a whole number of at least 1."
                    ))
                })?;
                self.quantity = quantity;
                Ok(EditReport::new(format!(
                    "This product now spawns {quantity} NPC(s)."
                )))
            }
            "onload" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "onload <script> | onload none",
                })?;
                if text.eq_ignore_ascii_case("none") {
                    self.on_load = None;
                    return Ok(EditReport::new(
                        "This product no longer runs a script on spawned NPCs.",
                    ));
                }
                let info = ctx.catalog.find_script(&text).ok_or(EditError::UnknownName {
                    kind: "script",
                    text,
                })?;
                self.on_load = Some(info.id);
                Ok(EditReport::new(format!(
                    "This product now runs {} on each spawned NPC.",
                    info.name
                )))
            }
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
