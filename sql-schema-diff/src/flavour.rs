use enumflags2::BitFlags;

/// Properties of the target MySQL server that change the generated DDL.
#[enumflags2::bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Circumstances {
    IsMariadb = 1,
    IsMysql56 = 1 << 1,
}

/// The MySQL-specific behaviors of the differ and renderer.
#[derive(Debug, Default, Clone)]
pub struct MysqlFlavour {
    circumstances: BitFlags<Circumstances>,
}

impl MysqlFlavour {
    pub fn new(circumstances: BitFlags<Circumstances>) -> Self {
        MysqlFlavour { circumstances }
    }

    /// Infer circumstances from a server version string, e.g.
    /// `"8.0.36"` or `"10.11.6-MariaDB"`.
    pub fn from_version_string(version: &str) -> Self {
        let mut circumstances = BitFlags::empty();

        if version.contains("MariaDB") {
            circumstances |= Circumstances::IsMariadb;
        }

        if version.starts_with("5.6") {
            circumstances |= Circumstances::IsMysql56;
        }

        MysqlFlavour { circumstances }
    }

    pub fn is_mariadb(&self) -> bool {
        self.circumstances.contains(Circumstances::IsMariadb)
    }

    pub fn is_mysql_5_6(&self) -> bool {
        self.circumstances.contains(Circumstances::IsMysql56)
    }

    /// MariaDB and MySQL 5.6 do not support `ALTER TABLE ... RENAME INDEX`.
    pub(crate) fn can_rename_index(&self) -> bool {
        !self.is_mariadb() && !self.is_mysql_5_6()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_detection() {
        assert!(MysqlFlavour::from_version_string("10.11.6-MariaDB").is_mariadb());
        assert!(MysqlFlavour::from_version_string("5.6.51").is_mysql_5_6());

        let mysql8 = MysqlFlavour::from_version_string("8.0.36");
        assert!(!mysql8.is_mariadb());
        assert!(mysql8.can_rename_index());
        assert!(!MysqlFlavour::from_version_string("5.6.51").can_rename_index());
    }
}
