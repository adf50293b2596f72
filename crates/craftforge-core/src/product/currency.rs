use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::fixed::{Fixed64, parse_fixed};
use crate::id::CurrencyId;
use crate::item::CurrencySpawn;
use crate::output::ProducedOutput;
use crate::product::commodity::zero;
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::ValidationContext;

/// Loads a pile of money worth a fixed amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyProduct {
    #[serde(default)]
    pub currency: Option<CurrencyId>,
    #[serde(with = "crate::fixed::decimal", default = "zero")]
    pub amount: Fixed64,
}

impl Default for CurrencyProduct {
    fn default() -> Self {
        Self {
            currency: None,
            amount: Fixed64::ZERO,
        }
    }
}

impl CurrencyProduct {
    pub fn new(currency: CurrencyId, amount: Fixed64) -> Self {
        Self {
            currency: Some(currency),
            amount,
        }
    }
}

impl ProductVariant for CurrencyProduct {
    const TAG: &'static str = "currency";
    const HELP: &'static str = "\
currency <currency> - sets the currency this product loads
amount <amount> - sets how much money is loaded";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let id = self
            .currency
            .ok_or(ProductionError::NotConfigured("currency"))?;
        let currency = ctx
            .world
            .currency(id)
            .ok_or_else(|| ProductionError::missing("currency", id))?;
        let coins = currency.breakdown(self.amount);
        if coins.is_empty() {
            log::warn!(
                "product {}: {} {} is smaller than any coin; nothing loaded",
                attempt.product,
                self.amount,
                currency.name
            );
            return Ok(ProducedOutput::entities(attempt.product, Vec::new()));
        }
        let pile = ctx.create_currency_pile(
            attempt.product,
            CurrencySpawn {
                currency: id,
                coins,
            },
        );
        Ok(ProducedOutput::entities(attempt.product, vec![pile]))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        let Some(currency) = self.currency else {
            return Some("You must set a currency for this product to load.".into());
        };
        if ctx.catalog.currency(currency).is_none() {
            return Some(format!("The currency {currency} no longer exists."));
        }
        if self.amount <= Fixed64::ZERO {
            return Some("The amount must be greater than zero.".into());
        }
        None
    }

    fn remapped(&self, _remap: &RevisionRemap) -> Self {
        self.clone()
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let currency = self
            .currency
            .and_then(|c| ctx.catalog.currency(c))
            .map(|c| c.name)
            .unwrap_or_else(|| "an unset currency".into());
        format!("{} {currency}", self.amount)
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        match command {
            "currency" => {
                let text = tokens.pop_rest().ok_or(EditError::MissingArgument {
                    usage: "currency <currency>",
                })?;
                let currency = ctx
                    .catalog
                    .find_currency(&text)
                    .ok_or(EditError::UnknownName {
                        kind: "currency",
                        text,
                    })?;
                self.currency = Some(currency.id);
                Ok(EditReport::new(format!(
                    "This product now loads money in {}.",
                    currency.name
                )))
            }
            "amount" => {
                let text = tokens.pop().ok_or(EditError::MissingArgument {
                    usage: "amount <amount>",
                })?;
                let amount = parse_fixed(&text)
                    .filter(|a| *a > Fixed64::ZERO)
                    .ok_or_else(|| {
                        EditError::InvalidArgument(format!(
                            "\"{text}\" is not a valid amount; it must be a number greater than zero."
                        ))
                    })?;
                self.amount = amount;
                Ok(EditReport::new(format!(
                    "This product now loads {amount} worth of money."
                )))
            }
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ConsumedInputs;
    use crate::item::ItemQuality;
    use crate::test_utils::{TestHarness, actor};
    use crate::world::WorldCatalog;

    #[test]
    fn loads_a_coin_breakdown() {
        let mut harness = TestHarness::new();
        let dollars = harness
            .world
            .add_currency("dollars", &[("cent", 0.01), ("dollar", 1.0), ("fiver", 5.0)]);
        let product = CurrencyProduct::new(dollars, Fixed64::from_num(7.02));
        assert!(product.why_not_valid(&harness.validation()).is_none());

        let output = harness
            .produce(&product, &ConsumedInputs::new(), ItemQuality::Standard)
            .unwrap();
        assert_eq!(output.created().len(), 1);
        let pile = harness.world.currency_of(output.created()[0]).unwrap();
        assert_eq!(pile.currency, dollars);
        let coin = |name: &str| {
            let info = harness.world.currency(dollars).unwrap();
            info.coins.iter().find(|c| c.name == name).unwrap().id
        };
        assert_eq!(
            pile.coins,
            vec![(coin("fiver"), 1), (coin("dollar"), 2), (coin("cent"), 2)]
        );
    }

    #[test]
    fn loads_three_cents_exactly() {
        let mut harness = TestHarness::new();
        let dollars = harness
            .world
            .add_currency("dollars", &[("cent", 0.01), ("dollar", 1.0)]);
        let product = CurrencyProduct::new(dollars, Fixed64::from_num(0.03));
        let output = harness
            .produce(&product, &ConsumedInputs::new(), ItemQuality::Standard)
            .unwrap();
        let pile = harness.world.currency_of(output.created()[0]).unwrap();
        let cent = harness.world.currency(dollars).unwrap().coins[0].id;
        assert_eq!(pile.coins, vec![(cent, 3)]);
    }

    #[test]
    fn dust_loads_nothing() {
        let mut harness = TestHarness::new();
        let marks = harness.world.add_currency("marks", &[("mark", 1.0)]);
        let product = CurrencyProduct::new(marks, Fixed64::from_num(0.5));
        let output = harness
            .produce(&product, &ConsumedInputs::new(), ItemQuality::Standard)
            .unwrap();
        assert!(output.created().is_empty());
    }

    #[test]
    fn validity() {
        let mut harness = TestHarness::new();
        let marks = harness.world.add_currency("marks", &[("mark", 1.0)]);
        let ctx = harness.validation();
        assert!(CurrencyProduct::default().why_not_valid(&ctx).is_some());
        assert!(
            CurrencyProduct::new(marks, Fixed64::ZERO)
                .why_not_valid(&ctx)
                .unwrap()
                .contains("greater than zero")
        );
        assert!(
            CurrencyProduct::new(CurrencyId(99), Fixed64::from_num(1))
                .why_not_valid(&ctx)
                .unwrap()
                .contains("no longer exists")
        );
    }

    #[test]
    fn edit_commands() {
        let mut harness = TestHarness::new();
        harness.world.add_currency("crowns", &[("crown", 1.0)]);
        let actor = actor();
        let ctx = harness.edit_context(&actor);
        let mut product = CurrencyProduct::default();
        product
            .edit("currency", &mut CommandTokens::parse("crowns"), &ctx)
            .unwrap();
        assert!(
            product
                .edit("amount", &mut CommandTokens::parse("zero"), &ctx)
                .is_err()
        );
        product
            .edit("amount", &mut CommandTokens::parse("12.5"), &ctx)
            .unwrap();
        assert_eq!(product.amount, Fixed64::from_num(12.5));
        assert!(product.why_not_valid(&harness.validation()).is_none());
    }
}
