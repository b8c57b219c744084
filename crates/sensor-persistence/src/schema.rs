// Esquema Diesel compartido por SQLite y Postgres.
// Relacional: procesos, solicitudes, sensores, cuentas_corrientes, facturas,
// facturas_detalle, movimientos_cuenta. Documentos: mediciones, alertas,
// historial_ejecucion. Los timestamps se guardan en microsegundos UTC.
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    procesos (id) {
        id -> BigInt,
        nombre -> Text,
        descripcion -> Nullable<Text>,
        tipo -> Text,
        costo -> Double,
        habilitado -> Bool,
    }
}
diesel::table! {
    solicitudes (id) {
        id -> Text,
        usuario_id -> BigInt,
        proceso_id -> BigInt,
        parametros -> Text,
        estado -> Text,
        fecha_solicitud_ts -> BigInt,
    }
}
diesel::table! {
    sensores (id) {
        id -> BigInt,
        nombre -> Text,
        ciudad -> Text,
        pais -> Text,
        estado -> Text,
    }
}
diesel::table! {
    cuentas_corrientes (usuario_id) {
        usuario_id -> BigInt,
        saldo -> Double,
    }
}
diesel::table! {
    facturas (id) {
        id -> Text,
        usuario_id -> BigInt,
        fecha_emision_ts -> BigInt,
        fecha_vencimiento_ts -> BigInt,
        total -> Double,
        estado -> Text,
    }
}
diesel::table! {
    facturas_detalle (id) {
        id -> Text,
        factura_id -> Text,
        solicitud_id -> Text,
        concepto -> Text,
        monto -> Double,
    }
}
diesel::table! {
    movimientos_cuenta (id) {
        id -> Text,
        usuario_id -> BigInt,
        tipo -> Text,
        monto -> Double,
        concepto -> Text,
        factura_id -> Nullable<Text>,
        saldo_posterior -> Double,
        fecha_ts -> BigInt,
    }
}
diesel::table! {
    mediciones (id) {
        id -> Text,
        sensor_id -> BigInt,
        ciudad -> Text,
        pais -> Text,
        temperatura -> Double,
        humedad -> Double,
        timestamp_ts -> BigInt,
    }
}
diesel::table! {
    alertas (id) {
        id -> Text,
        tipo -> Text,
        sensor_id -> BigInt,
        timestamp_ts -> BigInt,
        descripcion -> Text,
        estado -> Text,
    }
}
diesel::table! {
    historial_ejecucion (id) {
        id -> Text,
        solicitud_id -> Text,
        fecha_ejecucion_ts -> BigInt,
        resultado -> Text,
        completado -> Bool,
        reejecucion -> Bool,
    }
}
diesel::joinable!(solicitudes -> procesos (proceso_id));
diesel::joinable!(facturas_detalle -> facturas (factura_id));
allow_tables_to_appear_in_same_query!(procesos,
                                      solicitudes,
                                      sensores,
                                      cuentas_corrientes,
                                      facturas,
                                      facturas_detalle,
                                      movimientos_cuenta,
                                      mediciones,
                                      alertas,
                                      historial_ejecucion);
