use crate::geometry::{CropConstraints, CropRect};

/// Target ratio of a 2-inch passport photo (160:200).
pub const PHOTO_ASPECT: f32 = 160.0 / 200.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    IdCardFront,
    IdCardBack,
    GuardianId,
    HouseholdRecord,
    PoliceReport,
    OldDocument,
    PassportPhoto,
    PassportPage,
}

impl SlotKind {
    pub const ALL: [SlotKind; 8] = [
        SlotKind::IdCardFront,
        SlotKind::IdCardBack,
        SlotKind::GuardianId,
        SlotKind::HouseholdRecord,
        SlotKind::PoliceReport,
        SlotKind::OldDocument,
        SlotKind::PassportPhoto,
        SlotKind::PassportPage,
    ];

    /// Key used for this slot in the settings file.
    pub fn key(&self) -> &'static str {
        match self {
            SlotKind::IdCardFront => "id_card_front",
            SlotKind::IdCardBack => "id_card_back",
            SlotKind::GuardianId => "guardian_id",
            SlotKind::HouseholdRecord => "household_record",
            SlotKind::PoliceReport => "police_report",
            SlotKind::OldDocument => "old_document",
            SlotKind::PassportPhoto => "passport_photo",
            SlotKind::PassportPage => "passport_page",
        }
    }

    /// Name of the form field this slot fills.
    pub fn field(&self) -> &'static str {
        match self {
            SlotKind::IdCardFront => "idCardFront",
            SlotKind::IdCardBack => "idCardBack",
            SlotKind::GuardianId => "guardianId",
            SlotKind::HouseholdRecord => "householdRecord",
            SlotKind::PoliceReport => "policeReport",
            SlotKind::OldDocument => "oldDocument",
            SlotKind::PassportPhoto => "passportPhoto",
            SlotKind::PassportPage => "passportPage",
        }
    }

    /// Attachment category the committed image is filed under.
    pub fn category(&self) -> &'static str {
        match self {
            SlotKind::IdCardFront | SlotKind::IdCardBack => "ID card",
            SlotKind::GuardianId => "Guardian ID",
            SlotKind::HouseholdRecord => "Household record",
            SlotKind::PoliceReport => "Police report",
            SlotKind::OldDocument => "Old permit copy",
            SlotKind::PassportPhoto => "Passport photo",
            SlotKind::PassportPage => "Passport page",
        }
    }

    pub fn required(&self) -> bool {
        matches!(
            self,
            SlotKind::IdCardFront | SlotKind::IdCardBack | SlotKind::PassportPhoto
        )
    }

    pub fn profile(&self) -> SlotProfile {
        let (default_crop, constraints) = match self {
            SlotKind::IdCardFront | SlotKind::IdCardBack | SlotKind::GuardianId => {
                (CropRect::new(50.0, 50.0, 300.0, 190.0), GENERIC)
            }
            SlotKind::HouseholdRecord | SlotKind::PoliceReport | SlotKind::OldDocument => {
                (CropRect::new(50.0, 50.0, 400.0, 300.0), GENERIC)
            }
            SlotKind::PassportPhoto => (
                CropRect::new(50.0, 50.0, 160.0, 200.0),
                CropConstraints {
                    min_width: 80.0,
                    min_height: 100.0,
                    aspect: Some(PHOTO_ASPECT),
                },
            ),
            SlotKind::PassportPage => (
                CropRect::new(50.0, 50.0, 350.0, 250.0),
                CropConstraints {
                    min_width: 100.0,
                    min_height: 70.0,
                    aspect: None,
                },
            ),
        };
        SlotProfile {
            kind: *self,
            default_crop,
            constraints,
        }
    }
}

const GENERIC: CropConstraints = CropConstraints {
    min_width: 50.0,
    min_height: 30.0,
    aspect: None,
};

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotKind::IdCardFront => "ID card (front)",
            SlotKind::IdCardBack => "ID card (back)",
            SlotKind::GuardianId => "Guardian ID",
            SlotKind::HouseholdRecord => "Household record",
            SlotKind::PoliceReport => "Police report",
            SlotKind::OldDocument => "Old document scan",
            SlotKind::PassportPhoto => "Passport photo (2 inch)",
            SlotKind::PassportPage => "Passport page",
        };
        write!(f, "{}", s)
    }
}

/// Per-slot parameters of the capture widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotProfile {
    pub kind: SlotKind,
    pub default_crop: CropRect,
    pub constraints: CropConstraints,
}

impl SlotProfile {
    /// Replaces the default rectangle, growing it to the slot minimums.
    pub fn with_default_crop(mut self, mut rect: CropRect) -> Self {
        rect.width = rect.width.max(self.constraints.min_width);
        rect.height = rect.height.max(self.constraints.min_height);
        if let Some(ratio) = self.constraints.aspect {
            rect.height = rect.width / ratio;
        }
        self.default_crop = rect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_respect_minimums() {
        for kind in SlotKind::ALL {
            let profile = kind.profile();
            assert!(profile.default_crop.width >= profile.constraints.min_width, "{kind}");
            assert!(profile.default_crop.height >= profile.constraints.min_height, "{kind}");
        }
    }

    #[test]
    fn only_the_photo_is_fixed_aspect() {
        for kind in SlotKind::ALL {
            let fixed = kind.profile().constraints.aspect.is_some();
            assert_eq!(fixed, kind == SlotKind::PassportPhoto, "{kind}");
        }
    }

    #[test]
    fn override_is_grown_to_minimum() {
        let profile = SlotKind::IdCardFront
            .profile()
            .with_default_crop(CropRect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(profile.default_crop, CropRect::new(0.0, 0.0, 50.0, 30.0));

        let photo = SlotKind::PassportPhoto
            .profile()
            .with_default_crop(CropRect::new(0.0, 0.0, 240.0, 10.0));
        assert_eq!(photo.default_crop.height, 300.0);
    }

    #[test]
    fn field_names_are_unique() {
        let mut fields: Vec<_> = SlotKind::ALL.iter().map(|k| k.field()).collect();
        fields.sort();
        fields.dedup();
        assert_eq!(fields.len(), SlotKind::ALL.len());
    }
}
