//! The item target shared by every item-producing variant.

use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::id::{CharacteristicId, CharacteristicValueId, EntityId, PrototypeId, SkinId};
use crate::item::ItemSpawn;
use crate::product::ProductionError;
use crate::world::{PrototypeInfo, WorldCatalog};

macro_rules! template_help {
    () => {
        "item <prototype> - sets the item this product loads\n\
         quantity <#> - sets how many are loaded\n\
         skin <skin> - loads the item with a skin\n\
         skin none - clears the skin"
    };
}
pub(crate) use template_help;

pub const TEMPLATE_HELP: &str = template_help!();

/// Which prototype to load, how many, and with which skin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplate {
    #[serde(default)]
    pub target: Option<PrototypeId>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub skin: Option<SkinId>,
}

fn one() -> u32 {
    1
}

impl Default for ItemTemplate {
    fn default() -> Self {
        Self {
            target: None,
            quantity: 1,
            skin: None,
        }
    }
}

impl ItemTemplate {
    pub fn new(target: PrototypeId, quantity: u32) -> Self {
        Self {
            target: Some(target),
            quantity,
            skin: None,
        }
    }

    pub fn why_not_valid(&self, catalog: &dyn WorldCatalog) -> Option<String> {
        let Some(target) = self.target else {
            return Some("You must set an item for this product to load.".into());
        };
        if catalog.prototype(target).is_none() {
            return Some(format!("The item prototype {target} no longer exists."));
        }
        if self.quantity < 1 {
            return Some("The quantity must be at least 1.".into());
        }
        if let Some(skin) = self.skin {
            match catalog.skin(skin) {
                None => return Some(format!("The skin {skin} no longer exists.")),
                Some(info) if info.prototype != target => {
                    return Some(format!(
                        "The skin {} is not designed for the item this product loads.",
                        info.name
                    ));
                }
                Some(_) => {}
            }
        }
        None
    }

    /// The target prototype, resolved for production.
    pub fn prototype<C: WorldCatalog + ?Sized>(
        &self,
        catalog: &C,
    ) -> Result<PrototypeInfo, ProductionError> {
        let target = self
            .target
            .ok_or(ProductionError::NotConfigured("target item"))?;
        catalog
            .prototype(target)
            .ok_or_else(|| ProductionError::missing("item prototype", target))
    }

    /// Create the configured items, carrying skin, attempt quality, the
    /// material override and the given characteristic values.
    pub fn spawn(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
        characteristics: Vec<(CharacteristicId, CharacteristicValueId)>,
    ) -> Result<Vec<EntityId>, ProductionError> {
        let prototype = self.prototype(&*ctx.world)?;
        let base = ItemSpawn {
            prototype: prototype.id,
            quantity: 1,
            quality: ctx.item_quality(attempt.quality),
            skin: self.skin,
            material: attempt.material,
            characteristics,
        };
        Ok(ctx.create_copies(attempt.product, &prototype, self.quantity, base))
    }

    pub fn describe(&self, catalog: &dyn WorldCatalog) -> String {
        let item = match self.target.and_then(|t| catalog.prototype(t)) {
            Some(info) => info.describe(),
            None => "an unset item".to_string(),
        };
        let skin = self
            .skin
            .and_then(|s| catalog.skin(s))
            .map(|s| format!(" with skin {}", s.name))
            .unwrap_or_default();
        format!("{}x {item}{skin}", self.quantity)
    }

    /// Handle a template command. `None` when `command` is not one.
    pub fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Option<Result<EditReport, EditError>> {
        match command {
            "item" | "target" | "proto" => Some(self.edit_target(tokens, ctx)),
            "quantity" | "amount" => Some(self.edit_quantity(tokens)),
            "skin" => Some(self.edit_skin(tokens, ctx)),
            _ => None,
        }
    }

    fn edit_target(
        &mut self,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
            usage: "item <prototype>",
        })?;
        let info = ctx
            .catalog
            .find_prototype(&text)
            .ok_or(EditError::UnknownName {
                kind: "item prototype",
                text,
            })?;
        self.target = Some(info.id);
        // A skin made for the old prototype cannot carry over.
        if let Some(skin) = self.skin
            && ctx.catalog.skin(skin).map(|s| s.prototype) != Some(info.id)
        {
            self.skin = None;
        }
        Ok(EditReport::new(format!(
            "This product now loads {}.",
            info.describe()
        )))
    }

    fn edit_quantity(&mut self, tokens: &mut CommandTokens) -> Result<EditReport, EditError> {
        let text = tokens.pop().ok_or(EditError::MissingArgument {
            usage: "quantity <#>",
        })?;
        let quantity: u32 = text
            .parse()
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| {
                EditError::InvalidArgument(format!(
                    "\"{text}\" is not a valid quantity; it must be a whole number of at least 1."
                ))
            })?;
        self.quantity = quantity;
        Ok(EditReport::new(format!(
            "This product now loads {quantity} of its item."
        )))
    }

    fn edit_skin(
        &mut self,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
            usage: "skin <skin> | skin none",
        })?;
        if text.eq_ignore_ascii_case("none") {
            self.skin = None;
            return Ok(EditReport::new("This product no longer applies a skin."));
        }
        let Some(target) = self.target else {
            return Err(EditError::InvalidArgument(
                "You must set the item before choosing a skin.".into(),
            ));
        };
        let skin = ctx.catalog.find_skin(&text).ok_or(EditError::UnknownName {
            kind: "skin",
            text,
        })?;
        if skin.prototype != target {
            return Err(EditError::InvalidArgument(format!(
                "The skin {} is not designed for the item this product loads.",
                skin.name
            )));
        }
        self.skin = Some(skin.id);
        Ok(EditReport::new(format!(
            "This product now applies the skin {}.",
            skin.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Actor;
    use crate::id::CharacterId;
    use crate::test_utils::TestWorld;

    fn actor() -> Actor {
        Actor {
            id: CharacterId(1),
            name: "Editor".into(),
        }
    }

    #[test]
    fn default_template_is_invalid() {
        let world = TestWorld::new();
        let reason = ItemTemplate::default().why_not_valid(&world).unwrap();
        assert!(reason.contains("must set an item"));
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let mut world = TestWorld::new();
        let sword = world.add_prototype("sword", false, vec![]);
        let template = ItemTemplate::new(sword, 0);
        assert!(template.why_not_valid(&world).unwrap().contains("at least 1"));
    }

    #[test]
    fn skin_must_match_target() {
        let mut world = TestWorld::new();
        let sword = world.add_prototype("sword", false, vec![]);
        let shield = world.add_prototype("shield", false, vec![]);
        let skin = world.add_skin("gilded", shield);
        let mut template = ItemTemplate::new(sword, 1);
        template.skin = Some(skin);
        assert!(template.why_not_valid(&world).unwrap().contains("not designed"));
        template.target = Some(shield);
        assert!(template.why_not_valid(&world).is_none());
    }

    #[test]
    fn edit_commands() {
        let mut world = TestWorld::new();
        let sword = world.add_prototype("iron sword", false, vec![]);
        world.add_skin("gilded", sword);
        let actor = actor();
        let ctx = EditContext {
            catalog: &world,
            inputs: &[],
            actor: &actor,
        };
        let mut template = ItemTemplate::default();

        let mut tokens = CommandTokens::parse("skin gilded");
        let command = tokens.pop_keyword().unwrap();
        assert!(matches!(
            template.edit(&command, &mut tokens, &ctx),
            Some(Err(EditError::InvalidArgument(_)))
        ));

        let mut tokens = CommandTokens::parse("iron sword");
        assert!(template.edit("item", &mut tokens, &ctx).unwrap().is_ok());
        assert_eq!(template.target, Some(sword));

        let mut tokens = CommandTokens::parse("0");
        assert!(template.edit("quantity", &mut tokens, &ctx).unwrap().is_err());
        assert_eq!(template.quantity, 1);

        let mut tokens = CommandTokens::parse("4");
        assert!(template.edit("quantity", &mut tokens, &ctx).unwrap().is_ok());
        assert_eq!(template.quantity, 4);

        let mut tokens = CommandTokens::parse("gilded");
        assert!(template.edit("skin", &mut tokens, &ctx).unwrap().is_ok());
        assert!(template.skin.is_some());
        assert!(template.why_not_valid(&world).is_none());

        let mut tokens = CommandTokens::parse("bogus");
        assert!(template.edit("frobnicate", &mut tokens, &ctx).is_none());
    }

    #[test]
    fn unknown_prototype_is_rejected() {
        let world = TestWorld::new();
        let actor = actor();
        let ctx = EditContext {
            catalog: &world,
            inputs: &[],
            actor: &actor,
        };
        let mut template = ItemTemplate::default();
        let mut tokens = CommandTokens::parse("nothing");
        assert!(matches!(
            template.edit("item", &mut tokens, &ctx),
            Some(Err(EditError::UnknownName { .. }))
        ));
        assert_eq!(template, ItemTemplate::default());
    }

    #[test]
    fn describe_mentions_quantity_and_item() {
        let mut world = TestWorld::new();
        let nail = world.add_prototype("nail", true, vec![]);
        let text = ItemTemplate::new(nail, 20).describe(&world);
        assert!(text.starts_with("20x nail"));
    }

    #[test]
    fn missing_quantity_defaults_to_one() {
        let template: ItemTemplate = serde_json::from_str(r#"{"target": 3}"#).unwrap();
        assert_eq!(template.quantity, 1);
        assert_eq!(template.target, Some(PrototypeId(3)));
    }
}
