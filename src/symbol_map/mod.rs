pub mod error;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::event::Venue;
use error::SymbolMapError;

#[derive(Debug, Deserialize)]
struct VenueEntry {
    ws: String,
    rest: String,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct SymbolsFile(HashMap<String, HashMap<String, VenueEntry>>);

/// Bidirectional canonical <-> venue symbol translation, loaded once from a
/// JSON configuration file. Immutable after construction; share via `Arc`.
#[derive(Debug, Default)]
pub struct SymbolMap {
    sym2ws: HashMap<Venue, HashMap<String, String>>,
    ws2sym: HashMap<Venue, HashMap<String, String>>,
    sym2rest: HashMap<Venue, HashMap<String, String>>,
    rest2sym: HashMap<Venue, HashMap<String, String>>,
}

const VENUES: [Venue; 2] = [Venue::Binance, Venue::Kraken];

impl SymbolMap {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SymbolMapError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SymbolMapError> {
        let file: SymbolsFile = serde_json::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: SymbolsFile) -> Self {
        let mut map = SymbolMap::default();
        for venue in VENUES {
            let mut sym2ws = HashMap::new();
            let mut ws2sym = HashMap::new();
            let mut sym2rest = HashMap::new();
            let mut rest2sym = HashMap::new();

            for (canonical, venues) in &file.0 {
                if let Some(entry) = venues.get(venue.as_str()) {
                    sym2ws.insert(canonical.clone(), entry.ws.clone());
                    ws2sym.insert(entry.ws.clone(), canonical.clone());
                    sym2rest.insert(canonical.clone(), entry.rest.clone());
                    rest2sym.insert(entry.rest.clone(), canonical.clone());
                }
            }

            map.sym2ws.insert(venue, sym2ws);
            map.ws2sym.insert(venue, ws2sym);
            map.sym2rest.insert(venue, sym2rest);
            map.rest2sym.insert(venue, rest2sym);
        }
        map
    }

    pub fn to_ws(&self, venue: Venue, symbol: &str) -> Result<String, SymbolMapError> {
        self.sym2ws
            .get(&venue)
            .and_then(|m| m.get(symbol))
            .cloned()
            .ok_or_else(|| SymbolMapError::UnmappedSymbol {
                venue,
                symbol: symbol.to_owned(),
            })
    }

    pub fn to_rest(&self, venue: Venue, symbol: &str) -> Result<String, SymbolMapError> {
        self.sym2rest
            .get(&venue)
            .and_then(|m| m.get(symbol))
            .cloned()
            .ok_or_else(|| SymbolMapError::UnmappedSymbol {
                venue,
                symbol: symbol.to_owned(),
            })
    }

    pub fn from_ws(&self, venue: Venue, ws_symbol: &str) -> Result<String, SymbolMapError> {
        self.ws2sym
            .get(&venue)
            .and_then(|m| m.get(ws_symbol))
            .cloned()
            .ok_or_else(|| SymbolMapError::UnknownWsSymbol {
                venue,
                ws_symbol: ws_symbol.to_owned(),
            })
    }

    pub fn from_rest(&self, venue: Venue, rest_symbol: &str) -> Result<String, SymbolMapError> {
        self.rest2sym
            .get(&venue)
            .and_then(|m| m.get(rest_symbol))
            .cloned()
            .ok_or_else(|| SymbolMapError::UnknownRestSymbol {
                venue,
                rest_symbol: rest_symbol.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "btcusdt": {
            "binance": {"ws": "btcusdt", "rest": "BTCUSDT"},
            "kraken": {"ws": "XBT/USDT", "rest": "XBTUSDT"}
        },
        "ethusdt": {
            "binance": {"ws": "ethusdt", "rest": "ETHUSDT"}
        }
    }
    "#;

    #[test]
    fn round_trips_ws_symbols() {
        let map = SymbolMap::from_json_str(SAMPLE).unwrap();
        assert_eq!(map.to_ws(Venue::Binance, "btcusdt").unwrap(), "btcusdt");
        assert_eq!(map.to_ws(Venue::Kraken, "btcusdt").unwrap(), "XBT/USDT");
        assert_eq!(
            map.from_ws(Venue::Kraken, "XBT/USDT").unwrap(),
            "btcusdt"
        );
    }

    #[test]
    fn unmapped_venue_is_an_error() {
        let map = SymbolMap::from_json_str(SAMPLE).unwrap();
        assert!(map.to_ws(Venue::Kraken, "ethusdt").is_err());
    }
}
