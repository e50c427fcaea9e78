//! The eight inventory resources exposed by the gateway.
//!
//! Key columns follow the table primary keys. `lotes_bom` is read by batch
//! (`lote_id`, several lines per batch) but mutated by its surrogate
//! `row_id`. The two `estoques_*` snapshot tables are read-only.

use super::descriptor::{Column, ColumnKind, ResourceDescriptor};
use ColumnKind::{Date, Integer, Numeric, Text};

pub fn inventory_resources() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::builder("insumos", "sku_insumo")
            .writable(
                "sku_insumo",
                &[
                    Column::required("sku_insumo", Text),
                    Column::required("nome", Text),
                    Column::required("unidade_de_medida", Text),
                    Column::optional("descricao", Text),
                    Column::required("fornecedor", Text),
                    Column::required("tipo", Text),
                    Column::required("moq", Integer),
                ],
            )
            .build(),
        ResourceDescriptor::builder("produtos", "sku_produto")
            .writable(
                "sku_produto",
                &[
                    Column::required("sku_produto", Text),
                    Column::required("nome", Text),
                    Column::optional("variant", Text),
                    Column::required("unidade_de_medida", Text),
                    Column::required("preco_de_venda", Numeric),
                ],
            )
            .build(),
        // `id` is generated by the database
        ResourceDescriptor::builder("compras", "id")
            .writable(
                "id",
                &[
                    Column::required("data", Date),
                    Column::required("fornecedor", Text),
                    Column::required("sku_insumo", Text),
                    Column::required("quantidade", Numeric),
                    Column::required("custo_unitario", Numeric),
                ],
            )
            .build(),
        ResourceDescriptor::builder("lotes", "lote_id")
            .writable(
                "lote_id",
                &[
                    Column::required("lote_id", Text),
                    Column::required("data", Date),
                    Column::required("sku_produto", Text),
                    Column::required("quantidade_produzida", Numeric),
                ],
            )
            .build(),
        ResourceDescriptor::builder("lotes_bom", "lote_id")
            .order_by(&["lote_id", "sku_produto", "sku_insumo"])
            .writable(
                "row_id",
                &[
                    Column::required("lote_id", Text),
                    Column::required("sku_produto", Text),
                    Column::required("sku_insumo", Text),
                    Column::required("consumo_unit", Numeric),
                ],
            )
            .build(),
        ResourceDescriptor::builder("vendas", "id_pedido")
            .writable(
                "id_pedido",
                &[
                    Column::required("id_pedido", Text),
                    Column::required("data", Date),
                    Column::required("sku_produto", Text),
                    Column::required("quantidade", Numeric),
                    Column::required("preco_venda", Numeric),
                ],
            )
            .build(),
        ResourceDescriptor::builder("estoques_insumos", "sku_insumo")
            .order_by(&["sku_insumo", "rn"])
            .item_order_by(&["rn"])
            .build(),
        ResourceDescriptor::builder("estoques_produtos", "sku_produto")
            .order_by(&["sku_produto", "rn"])
            .item_order_by(&["rn"])
            .build(),
    ]
}
