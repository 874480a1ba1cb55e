//! Bus stop names and the line's gazetteer.

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

/// Every stop served by the line, in timetable order from Apeldoorn to Zwolle
/// (the two stations are listed first).
pub const LINE_STOPS: [&str; 42] = [
    "Apeldoorn, Station",
    "Zwolle, Station",
    "Apeldoorn, Marktplein",
    "Apeldoorn, Oranjepark/Regentesselaan",
    "Apeldoorn, Grote Kerk",
    "Apeldoorn, Bosweg",
    "Apeldoorn, Gedenknaald",
    "Apeldoorn, Van Haeftenkazerne",
    "Wenum, Wieselseweg",
    "Wenum, Papegaaiweg",
    "Wenum, De Haere",
    "Vaassen, Vaassen-Zuid",
    "Vaassen, Oosterhof",
    "Vaassen, Centrum",
    "Vaassen, Vaassen-Noord",
    "Emst, Handelsebrug",
    "Emst, Hezeplein",
    "Emst, Oranjeweg",
    "Epe, Klaarbeek",
    "Epe, Sint Jorisweg",
    "Epe, Diepenweg",
    "Epe, Centrum",
    "Epe, Politiebureau",
    "Heerde, Transferium Horsthoek",
    "Heerde, Eperweg",
    "Heerde, Brinklaan",
    "Heerde, Molenkampweg",
    "Heerde, Zwolseweg",
    "Heerde, Dreefseweg/Isala",
    "Wapenveld, Nachtegaalweg",
    "Wapenveld, Molenweg",
    "Wapenveld, Parkweg",
    "Wapenveld, Ir R.R. v/d Zeelaan",
    "Hattem, Pompstation",
    "Hattem, Zuid",
    "Hattem, Centrum",
    "Hattem, Noord",
    "Hattem, IJsselbrug",
    "Zwolle, Het Engelse Werk",
    "Zwolle, Katwolderplein/Centrum",
    "Zwolle, Oranje Nassaulaan",
    "Zwolle, Koningin Wilhelminastraat",
];

/// Error returned when building a gazetteer from a list with a repeated name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate stop in gazetteer: {0}")]
pub struct DuplicateStop(pub &'static str);

/// A canonical stop name, as spelled in the gazetteer.
///
/// Stops can only be obtained from a [`Gazetteer`], so holding a `Stop`
/// means the name is one the timetable knows about.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stop(&'static str);

impl Stop {
    /// The canonical name, e.g. `"Epe, Centrum"`.
    pub fn name(&self) -> &'static str {
        self.0
    }

    /// The place part of `"Place, Name"`, if the name has one.
    pub fn place(&self) -> Option<&'static str> {
        self.0.split_once(", ").map(|(place, _)| place)
    }

    /// The stop name without its place prefix.
    ///
    /// ```
    /// use bus_departures::domain::Gazetteer;
    ///
    /// let stop = Gazetteer::line().get("Wapenveld, Nachtegaalweg").unwrap();
    /// assert_eq!(stop.local_name(), "Nachtegaalweg");
    /// ```
    pub fn local_name(&self) -> &'static str {
        self.0.split_once(", ").map_or(self.0, |(_, name)| name)
    }

    /// Name for showing to users: the first `/` becomes `" - "`.
    ///
    /// ```
    /// use bus_departures::domain::Gazetteer;
    ///
    /// let stop = Gazetteer::line().get("Heerde, Dreefseweg/Isala").unwrap();
    /// assert_eq!(stop.display_name(), "Heerde, Dreefseweg - Isala");
    /// ```
    pub fn display_name(&self) -> String {
        self.0.replacen('/', " - ", 1)
    }
}

impl fmt::Debug for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stop({})", self.0)
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for Stop {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// Ordered, duplicate-free list of the stops the line serves.
///
/// Read-only after construction, so it can be shared freely between tasks.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    stops: Vec<Stop>,
}

impl Gazetteer {
    /// Build a gazetteer from canonical names, keeping their order.
    pub fn new(
        names: impl IntoIterator<Item = &'static str>,
    ) -> Result<Self, DuplicateStop> {
        let mut seen = HashSet::new();
        let mut stops = Vec::new();

        for name in names {
            if !seen.insert(name) {
                return Err(DuplicateStop(name));
            }
            stops.push(Stop(name));
        }

        Ok(Self { stops })
    }

    /// The gazetteer of the Apeldoorn - Zwolle line.
    pub fn line() -> Self {
        Self {
            stops: LINE_STOPS.iter().map(|&name| Stop(name)).collect(),
        }
    }

    /// Look up a stop by its exact, case-sensitive canonical name.
    pub fn get(&self, name: &str) -> Option<Stop> {
        self.stops.iter().copied().find(|stop| stop.0 == name)
    }

    /// Iterate over the stops in gazetteer order.
    pub fn iter(&self) -> impl Iterator<Item = Stop> + '_ {
        self.stops.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}
