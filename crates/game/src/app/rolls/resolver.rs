/// Weighted outcome selection over the compiled table. Override pools sit
/// in a narrow band of the scaled draw, gated by roll-index divisibility;
/// everything else walks the base table in declaration order.
pub(crate) struct RarityResolver {
    table: RarityTable,
}

impl RarityResolver {
    pub(crate) fn new(table: RarityTable) -> Self {
        let table = if table.is_empty() {
            warn!("resolver_received_empty_table_using_builtin");
            RarityTable::builtin_default()
        } else {
            table
        };
        Self { table }
    }

    pub(crate) fn table(&self) -> &RarityTable {
        &self.table
    }

    /// Always returns a def. A scaled draw no base entry covers (floating
    /// point edge) degrades to the first, most common entry.
    pub(crate) fn resolve(&self, roll_index: u64, draw: f64) -> &RarityDef {
        let total = self.table.total_weight();
        let scaled = draw.clamp(0.0, 1.0) * total;

        if let Some(pool) = self.first_matching_override(roll_index) {
            let band_start = OVERRIDE_FLOOR_WEIGHT;
            let band_end = OVERRIDE_FLOOR_WEIGHT + pool.pool_weight;
            if scaled >= band_start && scaled < band_end {
                return &pool.def;
            }
            // Outside the band the override is a non-event; the base walk
            // proceeds with the same scaled draw.
        }

        let mut running = 0.0f64;
        for def in self.table.defs() {
            running += def.weight;
            if running >= scaled {
                return def;
            }
        }

        self.table
            .fallback()
            .expect("resolver table is never empty")
    }

    /// First modulus in the fixed priority order that both has a configured
    /// pool and divides the roll index.
    fn first_matching_override(&self, roll_index: u64) -> Option<&engine::OverridePool> {
        if roll_index == 0 {
            return None;
        }
        for modulus in OVERRIDE_MODULUS_PRIORITY {
            let Some(pool) = self.table.override_for(modulus) else {
                continue;
            };
            if roll_index % modulus == 0 {
                return Some(pool);
            }
        }
        None
    }
}
