//! Lookup resolution: service delegation and formula hydration.

use crate::domain::{
    EngineError, LookupAnswer, LookupQuestion, LookupResolution, OutputListItem,
};

use super::core::OverlayEngine;

impl OverlayEngine {
    pub(crate) async fn lookup_inner(
        &self,
        question: &LookupQuestion,
    ) -> Result<LookupAnswer, EngineError> {
        let service = self
            .lookup_services
            .get(&question.service)
            .ok_or_else(|| EngineError::UnknownService(question.service.clone()))?;

        let resolution = service
            .lookup(question)
            .await
            .map_err(EngineError::LookupService)?;

        let formula = match resolution {
            LookupResolution::Answer(answer) => return Ok(answer),
            LookupResolution::Formula(formula) => formula,
        };

        // Hydrate: each formula entry names an unspent output; embed as
        // much of its history as the entry's selector asks for. Entries
        // whose output is gone are skipped.
        let mut outputs = Vec::with_capacity(formula.len());
        for entry in &formula {
            let found = self
                .storage
                .find_output(&entry.outpoint, None, Some(false))
                .await?;
            let Some(output) = found else {
                continue;
            };
            let hydrated = self.get_utxo_history(output, &entry.history, 0).await?;
            outputs.push(OutputListItem {
                beef: hydrated.beef,
                output_index: hydrated.outpoint.vout,
            });
        }
        Ok(LookupAnswer::OutputList { outputs })
    }
}
