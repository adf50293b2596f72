use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::command::{CommandTokens, EditContext, EditError, EditReport};
use crate::context::{Attempt, ProductionContext};
use crate::id::{CharacterId, InputId};
use crate::input::describe_input;
use crate::liquid::LiquidMixture;
use crate::output::{ForensicFinding, ForensicReport, ProducedOutput};
use crate::product::blood_typing::{consumed_liquid, edit_liquid_input};
use crate::product::{ProductVariant, ProductionError, unknown_command};
use crate::revision::RevisionRemap;
use crate::validation::{ValidationContext, check_liquid_input};

/// Compares the blood in two liquid inputs and reports whether any of it
/// came from the same person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnaTestProduct {
    #[serde(default)]
    pub first: Option<InputId>,
    #[serde(default)]
    pub second: Option<InputId>,
}

impl DnaTestProduct {
    pub fn new(first: InputId, second: InputId) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
        }
    }
}

fn donors(mixture: &LiquidMixture) -> BTreeSet<CharacterId> {
    mixture.blood_samples().map(|s| s.donor).collect()
}

/// Whether any blood in `first` shares a donor with blood in `second`.
pub fn shares_donor(first: &LiquidMixture, second: &LiquidMixture) -> bool {
    !donors(first).is_disjoint(&donors(second))
}

impl ProductVariant for DnaTestProduct {
    const TAG: &'static str = "dna-test";
    const HELP: &'static str = "\
first <#> - sets the first liquid input to compare
second <#> - sets the second liquid input to compare";

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let first = consumed_liquid(attempt, self.first)?;
        let second = consumed_liquid(attempt, self.second)?;
        let mut matched = shares_donor(first, second);
        if ctx.rng.roll(ctx.config.forensic_error_rate()) {
            matched = !matched;
        }
        let text = if matched {
            "The DNA test reports a match."
        } else {
            "The DNA test reports no match."
        };
        Ok(ProducedOutput::forensic(
            attempt.product,
            ForensicReport {
                text: text.to_string(),
                finding: ForensicFinding::Dna { matched },
                samples: vec![first.clone(), second.clone()],
            },
        ))
    }

    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        check_liquid_input(ctx.inputs, self.first, "first sample")
            .or_else(|| check_liquid_input(ctx.inputs, self.second, "second sample"))
    }

    fn remapped(&self, remap: &RevisionRemap) -> Self {
        Self {
            first: remap.input(self.first),
            second: remap.input(self.second),
        }
    }

    fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        format!(
            "a DNA comparison of {} with {}",
            describe_input(ctx.inputs, self.first),
            describe_input(ctx.inputs, self.second)
        )
    }

    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        match command {
            "first" => edit_liquid_input(&mut self.first, tokens, ctx, "first sample"),
            "second" => edit_liquid_input(&mut self.second, tokens, ctx, "second sample"),
            _ => Err(unknown_command(Self::HELP)),
        }
    }
}
