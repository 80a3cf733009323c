//! Index diffing against a MySQL schema: indexes implied by foreign keys,
//! renames (including ambiguous ones between structurally identical
//! indexes), functional indexes over JSON paths, and indexes declared
//! through raw DDL.

use expect_test::expect;
use indoc::indoc;
use pretty_assertions::assert_eq;
use sql_schema_diff::{
    calculate_sql_schema, metadata::*, update_schema_sql, Circumstances, MysqlFlavour, Pair,
};
use sql_schema_model::{ColumnTypeFamily, SqlSchema};

fn calculate(entities: Vec<Entity>) -> SqlSchema {
    let mut model = EntityModel::new();

    for entity in entities {
        model.push_entity(entity);
    }

    calculate_sql_schema(&model).unwrap()
}

fn author() -> Entity {
    Entity::new("Author")
        .property(Property::primary_key("id"))
        .property(Property::scalar("name", ColumnTypeFamily::String))
}

fn book1() -> Entity {
    Entity::new("Book1")
        .with_table_name("book")
        .property(Property::primary_key("id"))
        .property(Property::many_to_one("author1", "Author"))
        .property(Property::many_to_one("author2", "Author"))
        .property(Property::many_to_one("author3", "Author"))
        .property(Property::many_to_one("author4", "Author"))
        .property(Property::many_to_one("author5", "Author"))
        .property(Property::scalar("title", ColumnTypeFamily::String))
        .property(Property::scalar("isbn", ColumnTypeFamily::String).unique())
        .property(Property::scalar("metaData", ColumnTypeFamily::Json))
}

fn book2() -> Entity {
    Entity::new("Book2")
        .with_table_name("book")
        .property(Property::primary_key("id"))
        .property(Property::many_to_one("author1", "Author"))
        .property(Property::many_to_one("author2", "Author").indexed())
        .property(Property::many_to_one("author3", "Author"))
        .property(Property::many_to_one("author4", "Author").indexed())
        .property(Property::many_to_one("author5", "Author").indexed())
        .property(Property::scalar("title", ColumnTypeFamily::String))
        .property(Property::scalar("isbn", ColumnTypeFamily::String).unique_named("isbn_unique_constr"))
        .property(Property::scalar("metaData", ColumnTypeFamily::Json))
        .index(IndexAnnotation::on(["author1"]))
        .index(IndexAnnotation::on(["author3"]))
        .index(IndexAnnotation::on(["metaData.foo.bar.baz"]).returning("char(200)"))
        .index(IndexAnnotation::unique_on(["metaData.fooBar.email"]))
        .index(IndexAnnotation::raw(
            "title",
            "alter table `book` add index `custom_index_expr`(`title`)",
        ))
}

fn book3() -> Entity {
    Entity::new("Book3")
        .with_table_name("book")
        .property(Property::primary_key("id"))
        .property(Property::many_to_one("author1", "Author"))
        .property(Property::many_to_one("author2", "Author").indexed())
        .property(Property::many_to_one("author3", "Author"))
        .property(Property::many_to_one("author4", "Author").indexed())
        .property(Property::many_to_one("author5", "Author").indexed_named("auth_idx5"))
        .property(Property::scalar("title", ColumnTypeFamily::String))
        .property(Property::scalar("isbn", ColumnTypeFamily::String).unique())
        .property(Property::scalar("metaData", ColumnTypeFamily::Json))
        .index(IndexAnnotation::on(["author1"]))
        .index(IndexAnnotation::on(["author3"]).named("lol31"))
        .index(IndexAnnotation::on(["author3"]).named("lol41"))
        .index(IndexAnnotation::on(["metaData.foo.bar2", "metaData.foo.bar3"]))
        .index(IndexAnnotation::unique_on(["metaData.fooBar.bazBaz", "metaData.fooBar.lol123"]))
        .index(IndexAnnotation::raw(
            "title",
            "alter table `book` add index `custom_index_expr2`(`title`)",
        ))
}

fn book4() -> Entity {
    Entity::new("Book4")
        .with_table_name("book")
        .property(Property::primary_key("id"))
        .property(Property::many_to_one("author1", "Author"))
        .property(Property::many_to_one("author2", "Author").indexed())
        .property(Property::many_to_one("author3", "Author"))
        .property(Property::many_to_one("author4", "Author").indexed())
        .property(Property::many_to_one("author5", "Author").indexed_named("auth_idx5"))
        .property(Property::scalar("title", ColumnTypeFamily::String))
        .property(Property::scalar("isbn", ColumnTypeFamily::String).unique())
        .property(Property::scalar("metaData", ColumnTypeFamily::Json))
        .index(IndexAnnotation::on(["author1"]))
        .index(IndexAnnotation::on(["author3"]).named("lol32"))
        .index(IndexAnnotation::on(["author3"]).named("lol42"))
        .index(IndexAnnotation::raw(
            "title",
            "alter table `book` add index `custom_index_expr2`(`title`)",
        ))
}

#[test]
fn creating_a_table_with_foreign_keys_creates_their_indexes() {
    let previous = calculate(vec![author()]);
    let next = calculate(vec![author(), book1()]);

    let script = update_schema_sql(&previous, &next, &MysqlFlavour::default());

    let expected = expect![[r#"
        -- CreateTable
        CREATE TABLE `book` (
            `id` INTEGER NOT NULL AUTO_INCREMENT,
            `author1_id` INTEGER NOT NULL,
            `author2_id` INTEGER NOT NULL,
            `author3_id` INTEGER NOT NULL,
            `author4_id` INTEGER NOT NULL,
            `author5_id` INTEGER NOT NULL,
            `title` VARCHAR(191) NOT NULL,
            `isbn` VARCHAR(191) NOT NULL,
            `meta_data` JSON NOT NULL,

            UNIQUE INDEX `book_isbn_key`(`isbn`),
            PRIMARY KEY (`id`)
        ) DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;

        -- CreateIndex
        CREATE INDEX `book_author1_id_idx` ON `book`(`author1_id`);

        -- CreateIndex
        CREATE INDEX `book_author2_id_idx` ON `book`(`author2_id`);

        -- CreateIndex
        CREATE INDEX `book_author3_id_idx` ON `book`(`author3_id`);

        -- CreateIndex
        CREATE INDEX `book_author4_id_idx` ON `book`(`author4_id`);

        -- CreateIndex
        CREATE INDEX `book_author5_id_idx` ON `book`(`author5_id`);

        -- AddForeignKey
        ALTER TABLE `book` ADD CONSTRAINT `book_author1_id_fkey` FOREIGN KEY (`author1_id`) REFERENCES `author`(`id`) ON DELETE RESTRICT ON UPDATE CASCADE;

        -- AddForeignKey
        ALTER TABLE `book` ADD CONSTRAINT `book_author2_id_fkey` FOREIGN KEY (`author2_id`) REFERENCES `author`(`id`) ON DELETE RESTRICT ON UPDATE CASCADE;

        -- AddForeignKey
        ALTER TABLE `book` ADD CONSTRAINT `book_author3_id_fkey` FOREIGN KEY (`author3_id`) REFERENCES `author`(`id`) ON DELETE RESTRICT ON UPDATE CASCADE;

        -- AddForeignKey
        ALTER TABLE `book` ADD CONSTRAINT `book_author4_id_fkey` FOREIGN KEY (`author4_id`) REFERENCES `author`(`id`) ON DELETE RESTRICT ON UPDATE CASCADE;

        -- AddForeignKey
        ALTER TABLE `book` ADD CONSTRAINT `book_author5_id_fkey` FOREIGN KEY (`author5_id`) REFERENCES `author`(`id`) ON DELETE RESTRICT ON UPDATE CASCADE;
    "#]];
    expected.assert_eq(&script);
}

#[test]
fn adding_explicit_json_and_raw_indexes() {
    let previous = calculate(vec![author(), book1()]);
    let next = calculate(vec![author(), book2()]);

    let script = update_schema_sql(&previous, &next, &MysqlFlavour::default());

    // The indexes implied by the author foreign keys survive becoming
    // explicit annotations without any DDL. The renamed unique constraint on
    // isbn is detected as a rename, not a drop and create.
    let expected = expect![[r#"
        -- CreateIndex
        CREATE INDEX `book_meta_data_idx` ON `book`((json_value(`meta_data`, '$.foo.bar.baz' returning char(200))));

        -- CreateIndex
        CREATE UNIQUE INDEX `book_meta_data_key` ON `book`((json_value(`meta_data`, '$.fooBar.email')));

        -- CreateIndex
        alter table `book` add index `custom_index_expr`(`title`);

        -- RenameIndex
        ALTER TABLE `book` RENAME INDEX `book_isbn_key` TO `isbn_unique_constr`;
    "#]];
    expected.assert_eq(&script);
}

#[test]
fn renaming_and_redefining_indexes() {
    let previous = calculate(vec![author(), book2()]);
    let next = calculate(vec![author(), book3()]);

    let script = update_schema_sql(&previous, &next, &MysqlFlavour::default());

    // The composite JSON indexes keep their generated names, so the changed
    // expressions show up as redefinitions. The raw index changed its
    // statement and cannot be renamed in place.
    let expected = expect![[r#"
        -- DropIndex
        DROP INDEX `custom_index_expr` ON `book`;

        -- CreateIndex
        CREATE INDEX `lol41` ON `book`(`author3_id`);

        -- CreateIndex
        alter table `book` add index `custom_index_expr2`(`title`);

        -- RenameIndex
        ALTER TABLE `book` RENAME INDEX `book_author3_id_idx` TO `lol31`;

        -- RenameIndex
        ALTER TABLE `book` RENAME INDEX `book_author5_id_idx` TO `auth_idx5`;

        -- RenameIndex
        ALTER TABLE `book` RENAME INDEX `isbn_unique_constr` TO `book_isbn_key`;

        -- RedefineIndex
        DROP INDEX `book_meta_data_idx` ON `book`;
        CREATE INDEX `book_meta_data_idx` ON `book`((json_value(`meta_data`, '$.foo.bar2')), (json_value(`meta_data`, '$.foo.bar3')));

        -- RedefineIndex
        DROP INDEX `book_meta_data_key` ON `book`;
        CREATE UNIQUE INDEX `book_meta_data_key` ON `book`((json_value(`meta_data`, '$.fooBar.bazBaz')), (json_value(`meta_data`, '$.fooBar.lol123')));
    "#]];
    expected.assert_eq(&script);
}

#[test]
fn renames_between_structurally_identical_indexes_are_deterministic() {
    let previous = calculate(vec![author(), book3()]);
    let next = calculate(vec![author(), book4()]);

    let script = update_schema_sql(&previous, &next, &MysqlFlavour::default());

    // lol31 and lol41 are both plain indexes on author3_id. Pairing goes by
    // name order on both sides, so lol31 becomes lol32 and lol41 becomes
    // lol42, never crossed.
    let expected = expect![[r#"
        -- DropIndex
        DROP INDEX `book_meta_data_idx` ON `book`;

        -- DropIndex
        DROP INDEX `book_meta_data_key` ON `book`;

        -- RenameIndex
        ALTER TABLE `book` RENAME INDEX `lol31` TO `lol32`;

        -- RenameIndex
        ALTER TABLE `book` RENAME INDEX `lol41` TO `lol42`;
    "#]];
    expected.assert_eq(&script);
}

#[test]
fn renames_fall_back_to_redefine_on_mariadb() {
    let previous = calculate(vec![author(), book3()]);
    let next = calculate(vec![author(), book4()]);

    let flavour = MysqlFlavour::new(Circumstances::IsMariadb.into());
    let script = update_schema_sql(&previous, &next, &flavour);

    let expected = indoc! {r#"
        -- DropIndex
        DROP INDEX `book_meta_data_idx` ON `book`;

        -- DropIndex
        DROP INDEX `book_meta_data_key` ON `book`;

        -- RedefineIndex
        CREATE INDEX `lol32` ON `book`(`author3_id`);
        DROP INDEX `lol31` ON `book`;

        -- RedefineIndex
        CREATE INDEX `lol42` ON `book`(`author3_id`);
        DROP INDEX `lol41` ON `book`;
    "#};
    assert_eq!(script, expected);
}

#[test]
fn identical_models_diff_to_an_empty_script() {
    let previous = calculate(vec![author(), book3()]);
    let next = calculate(vec![author(), book3()]);

    let script = update_schema_sql(&previous, &next, &MysqlFlavour::default());

    assert_eq!(script, "");
}

#[test]
fn steps_come_out_in_execution_order() {
    let previous = calculate(vec![author(), book2()]);
    let next = calculate(vec![author(), book3()]);

    let steps = sql_schema_diff::diff(Pair::new(&previous, &next), &MysqlFlavour::default());
    let descriptions: Vec<&str> = steps.iter().map(|step| step.description()).collect();

    assert_eq!(
        descriptions,
        &[
            "DropIndex",
            "CreateIndex",
            "CreateIndex",
            "RenameIndex",
            "RenameIndex",
            "RenameIndex",
            "RedefineIndex",
            "RedefineIndex",
        ]
    );
}
