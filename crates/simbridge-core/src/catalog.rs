//! Catalog of world-object types known to the engine (name <-> tag).
//!
//! The engine ships several hundred models; only the subset that scenarios
//! in this workspace reach for is listed. The name is what the engine's
//! object factory expects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

macro_rules! object_catalog {
    ($($variant:ident => $name:literal,)*) => {
        /// A catalog entry, or [`ObjectType::Existing`] for objects that are
        /// already part of a loaded scenario and are looked up by name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ObjectType {
            /// Pre-existing object; never created through the factory.
            Existing,
            $($variant,)*
        }

        impl ObjectType {
            /// Every concrete (creatable) catalog entry.
            pub const CATALOG: &'static [Self] = &[$(Self::$variant,)*];

            /// Engine-side type name. `None` for [`ObjectType::Existing`].
            #[must_use]
            pub const fn type_name(self) -> Option<&'static str> {
                match self {
                    Self::Existing => None,
                    $(Self::$variant => Some($name),)*
                }
            }

            /// Look up a catalog entry by its engine-side name.
            #[must_use]
            pub fn from_type_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

object_catalog! {
    AudiA3 => "Audi_A3",
    AudiA8Sedan => "Audi_A8_Sedan",
    BmwX5Suv => "BMW_X5_SUV",
    CitroenC3Hatchback => "Citroen_C3_Hatchback",
    FiatBravo => "Fiat_Bravo_Hatchback",
    LexusGs450hFSportSedan => "Lexus_GS_450h_F_Sport_Sedan",
    MazdaRx8Coupe => "Mazda_RX8_Coupe",
    NissanAriyaSuv => "Nissan_Ariya_SUV",
    TeslaModel3 => "Tesla_Model_3",
    ToyotaPriusSedan => "Toyota_Prius_Sedan",
    ToyotaYarisHatchback => "Toyota_Yaris_Hatchback",
    VolkswagenPolo => "Volkswagen_Polo_Hatchback",
    DafTruck => "DAF_95_XF",
    MercedesBusCitaro => "Mercedes_Benz_Citaro",
    HondaPanEuropean => "Honda_Pan_European",
    Bicycle => "Bicycle",
    BalloonCar => "BalloonCar",
    Male => "Male_Regular",
    Female => "Female_Regular",
    Child => "Child_Regular",
    Box => "Box",
    Sphere => "Sphere",
    Cylinder => "Cylinder",
    TrafficCone => "TrafficCone",
    TrafficLight => "TrafficLight",
    Tree => "Tree_Birch",
    House => "House_Detached",
}

impl ObjectType {
    #[must_use]
    pub const fn is_existing(self) -> bool {
        matches!(self, Self::Existing)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name().unwrap_or("EXISTING"))
    }
}

impl FromStr for ObjectType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_type_name(s).ok_or_else(|| EngineError::UnknownObjectType(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for ty in ObjectType::CATALOG {
            let name = ty.type_name().unwrap();
            assert_eq!(ObjectType::from_type_name(name), Some(*ty));
        }
    }

    #[test]
    fn existing_has_no_type_name() {
        assert!(ObjectType::Existing.type_name().is_none());
        assert!(ObjectType::Existing.is_existing());
        assert!(!ObjectType::CATALOG.contains(&ObjectType::Existing));
    }

    #[test]
    fn parse_unknown_fails() {
        assert_eq!("Audi_A8_Sedan".parse::<ObjectType>().unwrap(), ObjectType::AudiA8Sedan);
        let err = "Flying_Carpet".parse::<ObjectType>().unwrap_err();
        assert!(err.to_string().contains("Flying_Carpet"));
    }

    #[test]
    fn display_uses_engine_name() {
        assert_eq!(ObjectType::LexusGs450hFSportSedan.to_string(), "Lexus_GS_450h_F_Sport_Sedan");
        assert_eq!(ObjectType::Existing.to_string(), "EXISTING");
    }
}
