use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport, resolve_input};
use crate::context::{Attempt, ProductionContext};
use crate::id::{CharacteristicId, CharacteristicValueId, InputId, PrototypeId};
use crate::input::describe_input;
use crate::output::ProducedOutput;
use crate::product::template::{ItemTemplate, template_help};
use crate::product::variable::{characteristic_name, check_characteristics_covered};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::{ValidationContext, check_item_input};
use crate::world::CharacteristicInfo;

/// Chooses one characteristic value from which prototype filled an input.
///
/// Several prototypes may map to the same value. Prototypes with no entry
/// take `default_value` when one is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLookup {
    pub characteristic: CharacteristicId,
    #[serde(default)]
    pub input: Option<InputId>,
    #[serde(default)]
    pub table: Vec<(PrototypeId, CharacteristicValueId)>,
    #[serde(default)]
    pub default_value: Option<CharacteristicValueId>,
}

impl InputLookup {
    pub fn new(characteristic: CharacteristicId, input: InputId) -> Self {
        Self {
            characteristic,
            input: Some(input),
            table: Vec::new(),
            default_value: None,
        }
    }

    pub fn map(mut self, prototype: PrototypeId, value: CharacteristicValueId) -> Self {
        self.set_mapping(prototype, value);
        self
    }

    fn set_mapping(&mut self, prototype: PrototypeId, value: CharacteristicValueId) {
        match self.table.iter_mut().find(|(p, _)| *p == prototype) {
            Some(entry) => entry.1 = value,
            None => self.table.push((prototype, value)),
        }
    }

    pub fn value_for(&self, prototype: PrototypeId) -> Option<CharacteristicValueId> {
        self.table
            .iter()
            .find(|(p, _)| *p == prototype)
            .map(|(_, v)| *v)
            .or(self.default_value)
    }
}

/// Loads an item whose characteristics come from lookup tables keyed by the
/// prototype consumed at an input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputVariableProduct {
    #[serde(default)]
    pub template: ItemTemplate,
    #[serde(default)]
    pub lookups: Vec<InputLookup>,
}

impl InputVariableProduct {
    pub fn new(template: ItemTemplate) -> Self {
        Self {
            template,
            lookups: Vec::new(),
        }
    }

    pub fn with_lookup(mut self, lookup: InputLookup) -> Self {
        self.lookups.retain(|l| l.characteristic != lookup.characteristic);
        self.lookups.push(lookup);
        self
    }

    fn lookup_mut(&mut self, characteristic: CharacteristicId) -> Option<&mut InputLookup> {
        self.lookups
            .iter_mut()
            .find(|l| l.characteristic == characteristic)
    }
}

fn find_value(info: &CharacteristicInfo, text: &str) -> Result<CharacteristicValueId, EditError> {
    info.find_value(text)
        .map(|v| v.id)
        .ok_or_else(|| EditError::UnknownName {
            kind: "characteristic value",
            text: text.to_string(),
        })
}

impl ProductVariant for InputVariableProduct {
    const TAG: &'static str = "input-variable";
    const HELP: &'static str = concat!(
        template_help!(),
        "\nlookup <characteristic> <input#> - decides a characteristic by what fills an input\n",
        "map <characteristic> <prototype> <value> - maps a consumed prototype to a value\n",
        "unmap <characteristic> <prototype> - removes a mapping\n",
        "default <characteristic> <value> - value for unmapped prototypes\n",
        "default <characteristic> none - unmapped prototypes cannot be used\n",
        "remove <characteristic> - removes a lookup"
    );

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let mut values = Vec::with_capacity(self.lookups.len());
        for lookup in &self.lookups {
            let input = lookup
                .input
                .ok_or(ProductionError::NotConfigured("lookup input"))?;
            let entity = attempt
                .consumed
                .get(input)
                .ok_or(ProductionError::InputNotConsumed(input))?
                .items()
                .first()
                .copied()
                .ok_or(ProductionError::InputEmpty(input))?;
            let prototype = ctx
                .world
                .entity(entity)
                .ok_or(ProductionError::MissingEntity(entity))?
                .prototype;
            let value = lookup
                .value_for(prototype)
                .ok_or(ProductionError::NoMapping {
                    characteristic: lookup.characteristic,
                    prototype,
                })?;
            values.push((lookup.characteristic, value));
        }
        let entities = self.template.spawn(attempt, ctx, values)?;
        Ok(ProducedOutput::entities(attempt.product, entities))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        if let Some(reason) = self.template.why_not_valid(ctx.catalog) {
            return Some(reason);
        }
        for lookup in &self.lookups {
            let name = characteristic_name(ctx.catalog, lookup.characteristic);
            let Some(info) = ctx.catalog.characteristic(lookup.characteristic) else {
                return Some(format!("The characteristic {name} no longer exists."));
            };
            if let Some(reason) =
                check_item_input(ctx.inputs, lookup.input, &format!("{name} lookup"))
            {
                return Some(reason);
            }
            if lookup.table.is_empty() && lookup.default_value.is_none() {
                return Some(format!(
                    "The {name} lookup has no mappings and no default value."
                ));
            }
            for (prototype, value) in &lookup.table {
                if ctx.catalog.prototype(*prototype).is_none() {
                    return Some(format!(
                        "The {name} lookup maps the prototype {prototype}, which no longer exists."
                    ));
                }
                if !info.contains(*value) {
                    return Some(format!(
                        "The {name} lookup maps to {value}, which is not a value of {name}."
                    ));
                }
            }
            if let Some(value) = lookup.default_value
                && !info.contains(value)
            {
                return Some(format!(
                    "The {name} default {value} is not a value of {name}."
                ));
            }
        }
        check_characteristics_covered(&self.template, ctx.catalog, |c| {
            self.lookups.iter().any(|l| l.characteristic == c)
        })
    }

    fn remapped(&self, remap: &RevisionRemap) -> Self {
        Self {
            template: self.template.clone(),
            lookups: self
                .lookups
                .iter()
                .map(|l| InputLookup {
                    input: remap.input(l.input),
                    ..l.clone()
                })
                .collect(),
        }
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let mut text = self.template.describe(ctx.catalog);
        for lookup in &self.lookups {
            text.push_str(&format!(
                "; {} by what fills {} ({} mapping(s){})",
                characteristic_name(ctx.catalog, lookup.characteristic),
                describe_input(ctx.inputs, lookup.input),
                lookup.table.len(),
                if lookup.default_value.is_some() {
                    ", with default"
                } else {
                    ""
                }
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
        if !matches!(command, "lookup" | "map" | "unmap" | "default" | "remove") {
            return Err(unknown_command(Self::HELP));
        }
        let text = tokens.pop().ok_or(EditError::MissingArgument {
            usage: "<command> <characteristic> ...",
        })?;
        let info = ctx
            .catalog
            .find_characteristic(&text)
            .ok_or(EditError::UnknownName {
                kind: "characteristic",
                text,
            })?;

        match command {
            "lookup" => {
                let ordinal = tokens.pop().ok_or(EditError::MissingArgument {
                    usage: "lookup <characteristic> <input#>",
                })?;
                let (index, input) = resolve_input(ctx.inputs, &ordinal)?;
                if !input.kind.consumes_items() {
                    return Err(EditError::IncompatibleInput {
                        ordinal: index + 1,
                        actual: input.kind.name(),
                        expected: "an item input",
                    });
                }
                match self.lookup_mut(info.id) {
                    Some(lookup) => lookup.input = Some(input.id),
                    None => self.lookups.push(InputLookup::new(info.id, input.id)),
                }
                Ok(EditReport::new(format!(
                    "This product now decides {} by what fills input ${}.",
                    info.name,
                    index + 1
                )))
            }
            "map" => {
                let (prototype, value) = match (tokens.pop(), tokens.pop_rest()) {
                    (Some(p), Some(v)) => (p, v),
                    _ => {
                        return Err(EditError::MissingArgument {
                            usage: "map <characteristic> <prototype> <value>",
                        });
                    }
                };
                let prototype = ctx
                    .catalog
                    .find_prototype(&prototype)
                    .ok_or(EditError::UnknownName {
                        kind: "item prototype",
                        text: prototype,
                    })?;
                let value = find_value(&info, &value)?;
                let lookup = self.lookup_mut(info.id).ok_or_else(|| {
                    EditError::InvalidArgument(format!(
                        "Set an input for {} with the lookup command first.",
                        info.name
                    ))
                })?;
                lookup.set_mapping(prototype.id, value);
                Ok(EditReport::new(format!(
                    "Consuming {} now gives {} the value {value}.",
                    prototype.name, info.name
                )))
            }
            "unmap" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "unmap <characteristic> <prototype>",
                })?;
                let prototype = ctx
                    .catalog
                    .find_prototype(&text)
                    .ok_or(EditError::UnknownName {
                        kind: "item prototype",
                        text,
                    })?;
                let lookup = self.lookup_mut(info.id).ok_or_else(|| {
                    EditError::InvalidArgument(format!("There is no lookup for {}.", info.name))
                })?;
                let before = lookup.table.len();
                lookup.table.retain(|(p, _)| *p != prototype.id);
                if lookup.table.len() == before {
                    return Err(EditError::InvalidArgument(format!(
                        "{} is not mapped for {}.",
                        prototype.name, info.name
                    )));
                }
                Ok(EditReport::new(format!(
                    "{} is no longer mapped for {}.",
                    prototype.name, info.name
                )))
            }
            "default" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "default <characteristic> <value> | default <characteristic> none",
                })?;
                let value = if text.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(find_value(&info, &text)?)
                };
                let lookup = self.lookup_mut(info.id).ok_or_else(|| {
                    EditError::InvalidArgument(format!(
                        "Set an input for {} with the lookup command first.",
                        info.name
                    ))
                })?;
                lookup.default_value = value;
                Ok(EditReport::new(match value {
                    Some(value) => format!("Unmapped prototypes now give {} the value {value}.", info.name),
                    None => format!("Unmapped prototypes can no longer decide {}.", info.name),
                }))
            }
            _ => {
                let before = self.lookups.len();
                self.lookups.retain(|l| l.characteristic != info.id);
                if self.lookups.len() == before {
                    return Err(EditError::InvalidArgument(format!(
                        "There is no lookup for {}.",
                        info.name
                    )));
                }
                Ok(EditReport::new(format!(
                    "This product no longer looks up {}.",
                    info.name
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ConsumedInput, ConsumedInputs, InputKind, RecipeInput};
    use crate::item::ItemQuality;
    use crate::test_utils::{TestHarness, actor};

    struct Fixture {
        harness: TestHarness,
        pie: PrototypeId,
        apple: PrototypeId,
        pear: PrototypeId,
        quince: PrototypeId,
        flavour: CharacteristicId,
    }

    fn fixture() -> Fixture {
        let mut harness = TestHarness::new();
        let flavour = harness.world.add_characteristic("flavour", &["sweet", "tart"]);
        let pie = harness.world.add_prototype("pie", false, vec![flavour]);
        let apple = harness.world.add_prototype("apple", true, vec![]);
        let pear = harness.world.add_prototype("pear", true, vec![]);
        let quince = harness.world.add_prototype("quince", true, vec![]);
        harness.inputs = vec![RecipeInput::new(InputId(1), InputKind::ItemGroup)];
        Fixture {
            harness,
            pie,
            apple,
            pear,
            quince,
            flavour,
        }
    }

    fn product(f: &Fixture) -> InputVariableProduct {
        let sweet = f.harness.world.value_named(f.flavour, "sweet");
        InputVariableProduct::new(ItemTemplate::new(f.pie, 1)).with_lookup(
            InputLookup::new(f.flavour, InputId(1))
                .map(f.apple, sweet)
                .map(f.pear, sweet),
        )
    }

    #[test]
    fn many_prototypes_map_to_one_value() {
        let mut f = fixture();
        let product = product(&f);
        assert!(product.why_not_valid(&f.harness.validation()).is_none());
        let sweet = f.harness.world.value_named(f.flavour, "sweet");
        for fruit in [f.apple, f.pear] {
            let consumed_fruit = f.harness.world.add_item(fruit, 3);
            let consumed = ConsumedInputs::new()
                .with(InputId(1), ConsumedInput::ItemGroup(vec![consumed_fruit]));
            let output = f
                .harness
                .produce(&product, &consumed, ItemQuality::Standard)
                .unwrap();
            let spawn = f.harness.world.spawn_of(output.created()[0]).unwrap();
            assert_eq!(spawn.characteristics, vec![(f.flavour, sweet)]);
        }
    }

    #[test]
    fn unmapped_prototype_uses_default_or_fails() {
        let mut f = fixture();
        let consumed_quince = f.harness.world.add_item(f.quince, 1);
        let consumed =
            ConsumedInputs::new().with(InputId(1), ConsumedInput::ItemGroup(vec![consumed_quince]));

        let mut product = product(&f);
        let err = f
            .harness
            .produce(&product, &consumed, ItemQuality::Standard)
            .unwrap_err();
        assert!(matches!(err, ProductionError::NoMapping { .. }));

        let tart = f.harness.world.value_named(f.flavour, "tart");
        product.lookups[0].default_value = Some(tart);
        let output = f
            .harness
            .produce(&product, &consumed, ItemQuality::Standard)
            .unwrap();
        let spawn = f.harness.world.spawn_of(output.created()[0]).unwrap();
        assert_eq!(spawn.characteristics, vec![(f.flavour, tart)]);
    }

    #[test]
    fn remap_carries_lookup_input() {
        let f = fixture();
        let mut remap = RevisionRemap::new();
        remap.insert_input(InputId(1), InputId(7));
        let remapped = product(&f).remapped(&remap);
        assert_eq!(remapped.lookups[0].input, Some(InputId(7)));
        assert_eq!(remapped.lookups[0].table, product(&f).lookups[0].table);
    }

    #[test]
    fn edit_builds_a_lookup() {
        let f = fixture();
        let actor = actor();
        let ctx = f.harness.edit_context(&actor);
        let mut product = InputVariableProduct::new(ItemTemplate::new(f.pie, 1));

        let mut tokens = CommandTokens::parse("flavour apple sweet");
        assert!(product.edit("map", &mut tokens, &ctx).is_err());

        let mut tokens = CommandTokens::parse("flavour 1");
        product.edit("lookup", &mut tokens, &ctx).unwrap();
        let mut tokens = CommandTokens::parse("flavour apple sweet");
        product.edit("map", &mut tokens, &ctx).unwrap();
        let mut tokens = CommandTokens::parse("flavour tart");
        product.edit("default", &mut tokens, &ctx).unwrap();
        assert_eq!(product.lookups[0].table.len(), 1);
        assert!(product.lookups[0].default_value.is_some());
        assert!(product.why_not_valid(&f.harness.validation()).is_none());

        let mut tokens = CommandTokens::parse("flavour apple");
        product.edit("unmap", &mut tokens, &ctx).unwrap();
        let mut tokens = CommandTokens::parse("flavour");
        product.edit("remove", &mut tokens, &ctx).unwrap();
        assert!(product.lookups.is_empty());
    }

    #[test]
    fn empty_lookup_is_invalid() {
        let f = fixture();
        let product = InputVariableProduct::new(ItemTemplate::new(f.pie, 1))
            .with_lookup(InputLookup::new(f.flavour, InputId(1)));
        let reason = product.why_not_valid(&f.harness.validation()).unwrap();
        assert!(reason.contains("no mappings"));
    }
}
