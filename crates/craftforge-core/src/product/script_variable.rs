use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::id::{CharacteristicId, CharacteristicValueId, ScriptId};
use crate::output::ProducedOutput;
use crate::product::template::{ItemTemplate, template_help};
use crate::product::variable::{characteristic_name, check_characteristics_covered};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;
use crate::world::{CharacteristicInfo, ScriptType, ScriptValue};

/// A characteristic computed by a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBinding {
    pub characteristic: CharacteristicId,
    pub script: Option<ScriptId>,
}

/// Loads an item whose characteristics are chosen by scripts that look at
/// everything the attempt consumed.
///
/// Each script takes one `ItemCollection` argument and returns the name of a
/// value (text), its id (number), or for a two-valued characteristic a
/// boolean picking the second value when true. Anything else falls back to
/// a random legal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptVariableProduct {
    #[serde(default)]
    pub template: ItemTemplate,
    #[serde(default)]
    pub scripts: Vec<ScriptBinding>,
}

const PARAMETERS: [ScriptType; 1] = [ScriptType::ItemCollection];

impl ScriptVariableProduct {
    pub fn new(template: ItemTemplate) -> Self {
        Self {
            template,
            scripts: Vec::new(),
        }
    }

    pub fn bind(mut self, characteristic: CharacteristicId, script: ScriptId) -> Self {
        self.set_binding(characteristic, Some(script));
        self
    }

    fn set_binding(&mut self, characteristic: CharacteristicId, script: Option<ScriptId>) {
        match self
            .scripts
            .iter_mut()
            .find(|b| b.characteristic == characteristic)
        {
            Some(binding) => binding.script = script,
            None => self.scripts.push(ScriptBinding {
                characteristic,
                script,
            }),
        }
    }
}

fn resolve_value(info: &CharacteristicInfo, value: &ScriptValue) -> Option<CharacteristicValueId> {
    match value {
        ScriptValue::Text(name) => info
            .values
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name.trim()))
            .map(|v| v.id),
        ScriptValue::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => {
            let id = CharacteristicValueId(*n as u64);
            info.contains(id).then_some(id)
        }
        ScriptValue::Boolean(flag) if info.values.len() == 2 => {
            Some(info.values[usize::from(*flag)].id)
        }
        _ => None,
    }
}

impl ProductVariant for ScriptVariableProduct {
    const TAG: &'static str = "script-variable";
    const HELP: &'static str = concat!(
        template_help!(),
        "\nbind <characteristic> <script> - computes a characteristic with a script\n",
        "unbind <characteristic> - removes a characteristic script"
    );

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let perceivable: Vec<ScriptValue> = attempt
            .consumed
            .perceivable_entities()
            .into_iter()
            .map(ScriptValue::Item)
            .collect();
        let mut values = Vec::with_capacity(self.scripts.len());
        for binding in &self.scripts {
            let script = binding
                .script
                .ok_or(ProductionError::NotConfigured("characteristic script"))?;
            let info = ctx
                .world
                .characteristic(binding.characteristic)
                .ok_or_else(|| ProductionError::missing("characteristic", binding.characteristic))?;
            let returned = ctx
                .scripts
                .invoke(script, vec![ScriptValue::Collection(perceivable.clone())]);
            let value = match resolve_value(&info, &returned) {
                Some(value) => value,
                None => {
                    if info.values.is_empty() {
                        return Err(ProductionError::missing(
                            "legal value of characteristic",
                            &info.name,
                        ));
                    }
                    let fallback = info.values[ctx.rng.pick(info.values.len())].id;
                    log::warn!(
                        "script {script} returned {returned:?} for {}; using random value {fallback}",
                        info.name
                    );
                    fallback
                }
            };
            values.push((binding.characteristic, value));
        }
        let entities = self.template.spawn(attempt, ctx, values)?;
        Ok(ProducedOutput::entities(attempt.product, entities))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        if let Some(reason) = self.template.why_not_valid(ctx.catalog) {
            return Some(reason);
        }
        for binding in &self.scripts {
            let name = characteristic_name(ctx.catalog, binding.characteristic);
            if ctx.catalog.characteristic(binding.characteristic).is_none() {
                return Some(format!("The characteristic {name} no longer exists."));
            }
            let Some(script) = binding.script else {
                return Some(format!("The script for {name} is not set."));
            };
            let Some(info) = ctx.catalog.script(script) else {
                return Some(format!("The script for {name} no longer exists."));
            };
            if !info.compiled {
                return Some(format!("The script {} for {name} is not compiled.", info.name));
            }
            if !matches!(
                info.return_type,
                ScriptType::Boolean | ScriptType::Number | ScriptType::Text
            ) {
                return Some(format!(
                    "The script {} for {name} must return a boolean, a number or text.",
                    info.name
                ));
            }
            if !info.accepts(&PARAMETERS) {
                return Some(format!(
                    "The script {} for {name} must take exactly one item collection.",
                    info.name
                ));
            }
        }
        check_characteristics_covered(&self.template, ctx.catalog, |c| {
            self.scripts
                .iter()
                .any(|b| b.characteristic == c && b.script.is_some())
        })
    }

    fn remapped(&self, _remap: &RevisionRemap) -> Self {
        self.clone()
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let mut text = self.template.describe(ctx.catalog);
        for binding in &self.scripts {
            let script = binding
                .script
                .and_then(|s| ctx.catalog.script(s))
                .map(|s| s.name)
                .unwrap_or_else(|| "no script".to_string());
            text.push_str(&format!(
                "; {} from {script}",
                characteristic_name(ctx.catalog, binding.characteristic)
            ));
        }
        text
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        if let Some(result) = self.template.edit(command, tokens, ctx) {
            return result;
        }
        match command {
            "bind" => {
                let (characteristic, script) = match (tokens.pop(), tokens.pop_rest()) {
                    (Some(c), Some(s)) => (c, s),
                    _ => {
                        return Err(EditError::MissingArgument {
                            usage: "bind <characteristic> <script>",
                        });
                    }
                };
                let characteristic = ctx
                    .catalog
                    .find_characteristic(&characteristic)
                    .ok_or(EditError::UnknownName {
                        kind: "characteristic",
                        text: characteristic,
                    })?;
                let script = ctx.catalog.find_script(&script).ok_or(EditError::UnknownName {
                    kind: "script",
                    text: script,
                })?;
                self.set_binding(characteristic.id, Some(script.id));
                Ok(EditReport::new(format!(
                    "This product now computes {} with the script {}.",
                    characteristic.name, script.name
                )))
            }
            "unbind" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "unbind <characteristic>",
                })?;
                let info = ctx
                    .catalog
                    .find_characteristic(&text)
                    .ok_or(EditError::UnknownName {
                        kind: "characteristic",
                        text,
                    })?;
                let before = self.scripts.len();
                self.scripts.retain(|b| b.characteristic != info.id);
                if self.scripts.len() == before {
                    return Err(EditError::InvalidArgument(format!(
                        "This product does not compute {}.",
                        info.name
                    )));
                }
                Ok(EditReport::new(format!(
                    "This product no longer computes {}.",
                    info.name
                )))
            }
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
