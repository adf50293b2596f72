use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport, resolve_input};
use crate::context::{Attempt, ProductionContext};
use crate::id::{CharacteristicId, InputId};
use crate::input::{describe_input, find_input};
use crate::output::ProducedOutput;
use crate::product::template::{ItemTemplate, template_help};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;
use crate::world::WorldCatalog;

/// A characteristic read straight off whatever filled an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub characteristic: CharacteristicId,
    pub input: Option<InputId>,
}

/// Loads an item whose characteristics (colour, shape...) are copied from
/// the consumed inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableProduct {
    #[serde(default)]
    pub template: ItemTemplate,
    #[serde(default)]
    pub bindings: Vec<VariableBinding>,
}

impl VariableProduct {
    pub fn new(template: ItemTemplate) -> Self {
        Self {
            template,
            bindings: Vec::new(),
        }
    }

    pub fn bind(mut self, characteristic: CharacteristicId, input: InputId) -> Self {
        self.set_binding(characteristic, Some(input));
        self
    }

    fn set_binding(&mut self, characteristic: CharacteristicId, input: Option<InputId>) {
        match self
            .bindings
            .iter_mut()
            .find(|b| b.characteristic == characteristic)
        {
            Some(binding) => binding.input = input,
            None => self.bindings.push(VariableBinding {
                characteristic,
                input,
            }),
        }
    }
}

/// Every characteristic the target prototype carries must be covered.
pub(crate) fn check_characteristics_covered(
    template: &ItemTemplate,
    catalog: &dyn WorldCatalog,
    covered: impl Fn(CharacteristicId) -> bool,
) -> Option<String> {
    let prototype = template.target.and_then(|t| catalog.prototype(t))?;
    for characteristic in prototype.characteristics {
        if !covered(characteristic) {
            let name = catalog
                .characteristic(characteristic)
                .map(|c| c.name)
                .unwrap_or_else(|| characteristic.to_string());
            return Some(format!(
                "{} requires a value for {name}, but this product does not set one.",
                prototype.name
            ));
        }
    }
    None
}

pub(crate) fn characteristic_name(catalog: &dyn WorldCatalog, id: CharacteristicId) -> String {
    catalog
        .characteristic(id)
        .map(|c| c.name)
        .unwrap_or_else(|| id.to_string())
}

impl ProductVariant for VariableProduct {
    const TAG: &'static str = "variable";
    const HELP: &'static str = concat!(
        template_help!(),
        "\nbind <characteristic> <input#> - takes a characteristic from an input\n",
        "unbind <characteristic> - removes a characteristic binding"
    );

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let mut values = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let input = binding
                .input
                .ok_or(ProductionError::NotConfigured("characteristic input"))?;
            let entity = attempt
                .consumed
                .get(input)
                .ok_or(ProductionError::InputNotConsumed(input))?
                .lead_entity()
                .ok_or(ProductionError::InputEmpty(input))?;
            let value = ctx
                .world
                .characteristic_value(entity, binding.characteristic)
                .ok_or(ProductionError::MissingCharacteristic {
                    entity,
                    characteristic: binding.characteristic,
                })?;
            values.push((binding.characteristic, value));
        }
        let entities = self.template.spawn(attempt, ctx, values)?;
        Ok(ProducedOutput::entities(attempt.product, entities))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        if let Some(reason) = self.template.why_not_valid(ctx.catalog) {
            return Some(reason);
        }
        for binding in &self.bindings {
            let name = characteristic_name(ctx.catalog, binding.characteristic);
            if ctx.catalog.characteristic(binding.characteristic).is_none() {
                return Some(format!("The characteristic {name} no longer exists."));
            }
            let Some(input) = binding.input else {
                return Some(format!("The input for {name} is not set."));
            };
            let Some((index, found)) = find_input(ctx.inputs, input) else {
                return Some(format!("The input for {name} no longer exists in this recipe."));
            };
            if !found.determines_variable(binding.characteristic) {
                return Some(format!(
                    "Input ${} cannot determine {name}.",
                    index + 1
                ));
            }
        }
        check_characteristics_covered(&self.template, ctx.catalog, |c| {
            self.bindings
                .iter()
                .any(|b| b.characteristic == c && b.input.is_some())
        })
    }

    fn remapped(&self, remap: &RevisionRemap) -> Self {
        Self {
            template: self.template.clone(),
            bindings: self
                .bindings
                .iter()
                .map(|b| VariableBinding {
                    characteristic: b.characteristic,
                    input: remap.input(b.input),
                })
                .collect(),
        }
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let mut text = self.template.describe(ctx.catalog);
        for binding in &self.bindings {
            text.push_str(&format!(
                "; {} from {}",
                characteristic_name(ctx.catalog, binding.characteristic),
                describe_input(ctx.inputs, binding.input)
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
                let (characteristic, input) = match (tokens.pop(), tokens.pop()) {
                    (Some(c), Some(i)) => (c, i),
                    _ => {
                        return Err(EditError::MissingArgument {
                            usage: "bind <characteristic> <input#>",
                        });
                    }
                };
                let info = ctx
                    .catalog
                    .find_characteristic(&characteristic)
                    .ok_or(EditError::UnknownName {
                        kind: "characteristic",
                        text: characteristic,
                    })?;
                let (index, input) = resolve_input(ctx.inputs, &input)?;
                if !input.determines_variable(info.id) {
                    return Err(EditError::InvalidArgument(format!(
                        "Input ${} cannot determine {}.",
                        index + 1,
                        info.name
                    )));
                }
                self.set_binding(info.id, Some(input.id));
                Ok(EditReport::new(format!(
                    "This product now takes {} from input ${}.",
                    info.name,
                    index + 1
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
                let before = self.bindings.len();
                self.bindings.retain(|b| b.characteristic != info.id);
                if self.bindings.len() == before {
                    return Err(EditError::InvalidArgument(format!(
                        "This product does not bind {}.",
                        info.name
                    )));
                }
                Ok(EditReport::new(format!(
                    "This product no longer binds {}.",
                    info.name
                )))
            }
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
