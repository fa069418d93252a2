use crate::models::Signal;

/// Record field an observation code feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationField {
    WardAllocation,
    Signal(Signal),
}

impl ObservationField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WardAllocation => "ward_allocation",
            Self::Signal(s) => s.as_str(),
        }
    }
}

/// One row of the LOINC code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationCode {
    pub field: ObservationField,
    pub code: &'static str,
    pub display: &'static str,
}

/// Fixed LOINC codes, one per record field, in publish order.
pub const OBSERVATION_CODES: [ObservationCode; 8] = [
    ObservationCode {
        field: ObservationField::WardAllocation,
        code: "91891-2",
        display: "Facility Bed type",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::TestResult),
        code: "95424-8",
        display: "SARS-CoV-2 (COVID-19) RNA in Respiratory specimen by Sequencing",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::DiseasePresence),
        code: "92256-7",
        display: "Has infectious disease or illness",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::Leukocytes),
        code: "33256-9",
        display: "Leukocytes [#/volume] corrected for nucleated erythrocytes in Blood by Automated count",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::Platelets),
        code: "777-3",
        display: "Platelets [#/volume] in Blood by Automated count",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::MeanPlateletVolume),
        code: "32623-1",
        display: "Platelet mean volume [Entitic volume] in Blood by Automated count",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::Eosinophils),
        code: "711-2",
        display: "Eosinophils [#/volume] in Blood by Automated count",
    },
    ObservationCode {
        field: ObservationField::Signal(Signal::Monocytes),
        code: "742-7",
        display: "Monocytes [#/volume] in Blood by Automated count",
    },
];

pub fn code_for(field: ObservationField) -> &'static ObservationCode {
    // Every field has exactly one row.
    OBSERVATION_CODES
        .iter()
        .find(|c| c.field == field)
        .unwrap_or(&OBSERVATION_CODES[0])
}

/// UCUM unit used when publishing a quantity signal.
pub fn unit_for(signal: Signal) -> &'static str {
    match signal {
        Signal::MeanPlateletVolume => "fL",
        _ => "10*3/uL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_signal_has_a_code() {
        for signal in Signal::ALL {
            let row = code_for(ObservationField::Signal(signal));
            assert_eq!(row.field, ObservationField::Signal(signal));
        }
        assert_eq!(code_for(ObservationField::WardAllocation).code, "91891-2");
    }

    #[test]
    fn codes_are_unique() {
        let codes: HashSet<_> = OBSERVATION_CODES.iter().map(|c| c.code).collect();
        assert_eq!(codes.len(), OBSERVATION_CODES.len());
    }

    #[test]
    fn platelet_volume_in_femtolitres() {
        assert_eq!(unit_for(Signal::MeanPlateletVolume), "fL");
        assert_eq!(unit_for(Signal::Leukocytes), "10*3/uL");
    }
}
